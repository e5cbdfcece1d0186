use crate::geometry::Rect;

/// Surface state pushed to the collaborator whenever focus or layout
/// changes it.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub struct ViewState {
    pub activated: bool,
    pub fullscreen: bool,
    pub maximized: bool,
}

/// External surface behind a `View` node. The core computes geometry and
/// state and pushes them here; the wire protocol and surface lifecycle
/// live entirely on the other side of this trait.
pub trait View {
    fn set_geometry(&mut self, rect: Rect);
    fn set_state(&mut self, state: ViewState);
    fn request_focus(&mut self);
    /// Ask for the surface to be stacked above its siblings.
    fn raise(&mut self);
    fn close(&mut self);
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    pub(crate) enum ViewCall {
        Geometry(Rect),
        State(ViewState),
        Focus,
        Raise,
        Close,
    }

    /// Records every call so tests can assert on the traffic across the
    /// collaborator boundary.
    #[derive(Default)]
    pub(crate) struct RecordingView {
        pub(crate) calls: Rc<RefCell<Vec<ViewCall>>>,
    }

    impl RecordingView {
        pub(crate) fn new() -> (Box<dyn View>, Rc<RefCell<Vec<ViewCall>>>) {
            let view = RecordingView::default();
            let calls = view.calls.clone();
            (Box::new(view), calls)
        }
    }

    impl View for RecordingView {
        fn set_geometry(&mut self, rect: Rect) {
            self.calls.borrow_mut().push(ViewCall::Geometry(rect));
        }

        fn set_state(&mut self, state: ViewState) {
            self.calls.borrow_mut().push(ViewCall::State(state));
        }

        fn request_focus(&mut self) {
            self.calls.borrow_mut().push(ViewCall::Focus);
        }

        fn raise(&mut self) {
            self.calls.borrow_mut().push(ViewCall::Raise);
        }

        fn close(&mut self) {
            self.calls.borrow_mut().push(ViewCall::Close);
        }
    }
}
