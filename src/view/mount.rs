use std::cell::RefCell;
use std::rc::Rc;

use super::ViewTree;

/// Shared handle to a mounted view tree.
///
/// Playback tasks and the host hold clones of the same mount. Everything runs
/// on one thread, and no borrow is ever held across a suspension point.
#[derive(Clone, Default)]
pub struct Mount(Rc<RefCell<ViewTree>>);

impl Mount {
    pub fn new() -> Self {
        Mount(Rc::new(RefCell::new(ViewTree::new())))
    }

    pub fn read<R>(&self, f: impl FnOnce(&ViewTree) -> R) -> R {
        f(&self.0.borrow())
    }

    pub fn update<R>(&self, f: impl FnOnce(&mut ViewTree) -> R) -> R {
        f(&mut self.0.borrow_mut())
    }

    /// Like `update`, but skipped when the tree is already borrowed.
    pub(crate) fn try_update<R>(&self, f: impl FnOnce(&mut ViewTree) -> R) -> Option<R> {
        self.0.try_borrow_mut().ok().map(|mut tree| f(&mut tree))
    }

    /// Simulate a click on the mount point.
    pub fn click(&self) -> usize {
        self.update(|tree| tree.dispatch_click())
    }

    pub fn reset(&self) {
        self.update(|tree| tree.reset());
    }

    pub fn text(&self) -> String {
        self.read(|tree| tree.text_content(tree.root()))
    }

    pub fn count_class(&self, class: &str) -> usize {
        self.read(|tree| tree.find_by_class(class).len())
    }

    pub fn is_empty(&self) -> bool {
        self.read(|tree| tree.is_empty())
    }
}
