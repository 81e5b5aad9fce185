//! View tree integration.
//!
//! `View` is the capability set every view kind shares: parent attachment,
//! visibility and bounds. `OffscreenHostView` implements it on top of an
//! `OffscreenRenderSurface` so an off-screen page can sit in the same tree as
//! any other view.

use crate::rendering::Rect;
use crate::surface::OffscreenRenderSurface;
use log::warn;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewId(u64);

impl ViewId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        ViewId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

pub trait View: Send {
    fn id(&self) -> ViewId;

    /// Bounds in the parent's coordinate space, in DIPs.
    fn bounds(&self) -> Rect;
    fn set_bounds(&mut self, bounds: Rect);

    fn is_visible(&self) -> bool;
    fn set_visible(&mut self, visible: bool);

    fn parent(&self) -> Option<ViewId>;

    /// Called by a container when the view joins it.
    fn on_attached(&mut self, parent: ViewId);
    /// Called by a container when the view leaves it.
    fn on_detached(&mut self);
}

/// A plain view that only holds children.
pub struct ContainerView {
    id: ViewId,
    bounds: Rect,
    visible: bool,
    parent: Option<ViewId>,
    children: Vec<Box<dyn View>>,
}

impl ContainerView {
    pub fn new(bounds: Rect) -> Self {
        ContainerView {
            id: ViewId::next(),
            bounds,
            visible: true,
            parent: None,
            children: Vec::new(),
        }
    }

    /// Append a child. A child that already has a parent is still accepted;
    /// it is re-parented here.
    pub fn add_child_view(&mut self, mut child: Box<dyn View>) -> ViewId {
        let id = child.id();
        child.on_attached(self.id);
        self.children.push(child);
        id
    }

    /// Detach and return the child with `id`.
    pub fn remove_child_view(&mut self, id: ViewId) -> Option<Box<dyn View>> {
        let idx = self.children.iter().position(|c| c.id() == id)?;
        let mut child = self.children.remove(idx);
        child.on_detached();
        Some(child)
    }

    pub fn children(&self) -> &[Box<dyn View>] {
        &self.children
    }

    pub fn child_mut(&mut self, id: ViewId) -> Option<&mut (dyn View + 'static)> {
        self.children.iter_mut().find(|c| c.id() == id).map(|c| c.as_mut())
    }
}

impl View for ContainerView {
    fn id(&self) -> ViewId {
        self.id
    }

    fn bounds(&self) -> Rect {
        self.bounds
    }

    fn set_bounds(&mut self, bounds: Rect) {
        self.bounds = bounds;
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    fn parent(&self) -> Option<ViewId> {
        self.parent
    }

    fn on_attached(&mut self, parent: ViewId) {
        self.parent = Some(parent);
    }

    fn on_detached(&mut self) {
        self.parent = None;
    }
}

/// A view whose contents come from an off-screen surface.
///
/// The surface is treated as visible only while the view is both visible and
/// attached to a parent; otherwise it is paused and keeps accumulating
/// damage. Bounds changes resize the surface at the host's scale factor.
pub struct OffscreenHostView {
    id: ViewId,
    bounds: Rect,
    visible: bool,
    parent: Option<ViewId>,
    screen_scale: f32,
    surface: Arc<OffscreenRenderSurface>,
}

impl OffscreenHostView {
    pub fn new(surface: Arc<OffscreenRenderSurface>) -> Self {
        let size = surface.view_size();
        let view = OffscreenHostView {
            id: ViewId::next(),
            bounds: Rect::new(0, 0, size.width, size.height),
            visible: true,
            parent: None,
            screen_scale: size.scale_factor,
            surface,
        };
        view.sync_visibility();
        view
    }

    pub fn surface(&self) -> &Arc<OffscreenRenderSurface> {
        &self.surface
    }

    /// The host moved to a display with a different scale factor.
    pub fn set_screen_scale_factor(&mut self, scale_factor: f32) {
        if let Err(e) = self.surface.resize(self.bounds.width, self.bounds.height, scale_factor) {
            warn!("Ignoring scale factor change: {}", e);
            return;
        }
        self.screen_scale = scale_factor;
    }

    fn sync_visibility(&self) {
        self.surface.set_visible(self.visible && self.parent.is_some());
    }
}

impl View for OffscreenHostView {
    fn id(&self) -> ViewId {
        self.id
    }

    fn bounds(&self) -> Rect {
        self.bounds
    }

    fn set_bounds(&mut self, bounds: Rect) {
        if let Err(e) = self.surface.resize(bounds.width, bounds.height, self.screen_scale) {
            warn!("Ignoring bounds {:?}: {}", bounds, e);
            return;
        }
        self.bounds = bounds;
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
        self.sync_visibility();
    }

    fn parent(&self) -> Option<ViewId> {
        self.parent
    }

    fn on_attached(&mut self, parent: ViewId) {
        self.parent = Some(parent);
        self.sync_visibility();
    }

    fn on_detached(&mut self) {
        self.parent = None;
        self.sync_visibility();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rendering::Size;
    use crate::surface::SurfaceState;
    use crate::target::NoopRenderTarget;
    use crate::SurfaceConfig;

    fn host(w: u32, h: u32) -> OffscreenHostView {
        let cfg = SurfaceConfig { width: w, height: h, ..Default::default() };
        let surface = Arc::new(OffscreenRenderSurface::new(cfg).unwrap());
        surface.attach(Box::new(NoopRenderTarget::new()));
        OffscreenHostView::new(surface)
    }

    #[test]
    fn unparented_host_view_is_paused() {
        let view = host(10, 10);
        assert_eq!(view.surface().state(), SurfaceState::Paused);
    }

    #[test]
    fn attaching_to_container_activates_surface() {
        let view = host(10, 10);
        let surface = view.surface().clone();
        let mut root = ContainerView::new(Rect::new(0, 0, 100, 100));
        let id = root.add_child_view(Box::new(view));
        assert_eq!(surface.state(), SurfaceState::Active);

        root.child_mut(id).unwrap().set_visible(false);
        assert_eq!(surface.state(), SurfaceState::Paused);
        root.child_mut(id).unwrap().set_visible(true);
        assert_eq!(surface.state(), SurfaceState::Active);

        let child = root.remove_child_view(id).unwrap();
        assert!(child.parent().is_none());
        assert_eq!(surface.state(), SurfaceState::Paused);
    }

    #[test]
    fn bounds_resize_surface_and_bad_bounds_are_ignored() {
        let mut view = host(10, 10);
        view.set_bounds(Rect::new(5, 5, 40, 20));
        assert_eq!(view.surface().pixel_size(), Size::new(40, 20));
        view.set_bounds(Rect::new(0, 0, 0, 20));
        assert_eq!(view.bounds(), Rect::new(5, 5, 40, 20));

        view.set_screen_scale_factor(2.0);
        assert_eq!(view.surface().pixel_size(), Size::new(80, 40));
    }

    #[test]
    fn views_are_polymorphic() {
        let mut root = ContainerView::new(Rect::new(0, 0, 100, 100));
        root.add_child_view(Box::new(ContainerView::new(Rect::new(0, 0, 10, 10))));
        root.add_child_view(Box::new(host(10, 10)));
        assert_eq!(root.children().len(), 2);
        assert!(root.children().iter().all(|c| c.parent() == Some(root.id())));
    }
}
