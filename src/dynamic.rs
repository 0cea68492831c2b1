//! Dynamic content context.
//!
//! Some blocks render from live data (the "current" content item, the main
//! query). Before such markup is expanded an ambient item is selected and
//! pushed onto the request's [`RenderContext`]; afterwards the previous
//! state is restored and any throwaway item created for the render is
//! deleted.
//!
//! The ambient state is an explicit value owned by the request in flight.
//! It is not safe to share between two concurrent renders: the deployment
//! must serialize requests per worker so one request owns it from parse to
//! response.

use std::collections::HashSet;
use std::ops::{Deref, DerefMut};

use log::{debug, warn};

use crate::blocks::parse_blocks;
use crate::hooks::Hooks;
use crate::host::{ContentStore, Item, ItemOrder, ItemQuery, ItemStatus, NewItem, SiteCatalog};

/// One saved level of ambient state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AmbientFrame {
    pub item: Option<Item>,
}

/// Ambient rendering state with save/restore semantics.
#[derive(Debug, Clone, Default)]
pub struct RenderContext {
    frames: Vec<AmbientFrame>,
}

impl RenderContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// The item dynamic blocks currently render against.
    pub fn current_item(&self) -> Option<&Item> {
        self.frames.last().and_then(|f| f.item.as_ref())
    }

    pub fn push(&mut self, frame: AmbientFrame) {
        self.frames.push(frame);
    }

    pub fn pop(&mut self) -> Option<AmbientFrame> {
        self.frames.pop()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}

/// Whether `name` is a block type with a live-data render path.
pub fn is_dynamic_block(catalog: &dyn SiteCatalog, hooks: &Hooks, name: &str) -> bool {
    if name.is_empty() {
        return false;
    }
    let registered = catalog.block_type(name).map(|t| t.dynamic).unwrap_or(false);
    hooks.is_dynamic_block.apply(registered, name)
}

/// Whether any block in `markup`, at any depth, is dynamic.
pub fn requires_context(catalog: &dyn SiteCatalog, hooks: &Hooks, markup: &str) -> bool {
    if markup.is_empty() {
        return false;
    }
    let registered: HashSet<String> = catalog
        .block_types()
        .into_iter()
        .filter(|t| t.dynamic)
        .map(|t| t.name)
        .collect();
    parse_blocks(markup).iter().any(|block| {
        block.walk(&mut |node| match node.name.as_deref() {
            Some(name) => hooks
                .is_dynamic_block
                .apply(registered.contains(name), name),
            None => false,
        })
    })
}

/// What [`DynamicContext::activate`] changed, needed to undo it.
#[derive(Debug, Default)]
#[must_use = "an activated context must be deactivated"]
pub struct ContextHandle {
    pushed: bool,
    temporary_item: Option<u64>,
}

impl ContextHandle {
    /// Whether an ambient item was established.
    pub fn is_active(&self) -> bool {
        self.pushed
    }

    /// Id of the throwaway item created for this render, if any.
    pub fn temporary_item(&self) -> Option<u64> {
        self.temporary_item
    }
}

/// Selects and establishes the ambient item for dynamic renders.
pub struct DynamicContext<'h> {
    content: &'h dyn ContentStore,
    hooks: &'h Hooks,
    configured_item: Option<u64>,
    fallback_item: NewItem,
}

impl<'h> DynamicContext<'h> {
    pub fn new(
        content: &'h dyn ContentStore,
        hooks: &'h Hooks,
        configured_item: Option<u64>,
        fallback_item: NewItem,
    ) -> Self {
        Self {
            content,
            hooks,
            configured_item,
            fallback_item,
        }
    }

    /// Establish an ambient item: the configured one, else the most recently
    /// published item of any type, else a temporary item created for this
    /// render only.
    pub fn activate(&self, ctx: &mut RenderContext) -> ContextHandle {
        let mut handle = ContextHandle::default();

        let configured = self.hooks.dynamic_item_id.apply(self.configured_item, &());
        let mut item = configured.and_then(|id| self.content.get(id));
        if item.is_none() {
            item = self
                .content
                .query(&ItemQuery {
                    statuses: vec![ItemStatus::Publish],
                    order: ItemOrder::NewestFirst,
                    limit: Some(1),
                    ..Default::default()
                })
                .into_iter()
                .next();
        }
        if item.is_none() {
            item = self.create_temporary(&mut handle);
        }

        match item {
            Some(item) => {
                debug!("dynamic context: ambient item {} ({})", item.id, item.item_type);
                ctx.push(AmbientFrame { item: Some(item) });
                handle.pushed = true;
            }
            None => debug!("dynamic context: no ambient item available"),
        }
        handle
    }

    /// Restore the state saved by `activate` and delete any temporary item.
    /// A failed delete is logged; the page has already been rendered.
    pub fn deactivate(&self, ctx: &mut RenderContext, handle: ContextHandle) {
        if handle.pushed {
            ctx.pop();
        }
        if let Some(id) = handle.temporary_item {
            match self.content.delete(id) {
                Ok(()) => debug!("dynamic context: deleted temporary item {id}"),
                Err(e) => warn!("dynamic context: failed to delete temporary item {id}: {e}"),
            }
        }
    }

    /// Enter a scope over `ctx`, activating only when `activate` is true.
    /// Teardown runs when the returned guard is dropped, on every exit path.
    pub fn enter<'a>(&'a self, ctx: &'a mut RenderContext, activate: bool) -> ActiveContext<'a, 'h> {
        let handle = activate.then(|| self.activate(ctx));
        ActiveContext {
            dynamic: self,
            ctx,
            handle,
        }
    }

    fn create_temporary(&self, handle: &mut ContextHandle) -> Option<Item> {
        let args = self
            .hooks
            .fallback_item
            .apply(Some(self.fallback_item.clone()), &())?;
        match self.content.insert(args) {
            Ok(id) => {
                handle.temporary_item = Some(id);
                self.content.get(id)
            }
            Err(e) => {
                warn!("dynamic context: could not create temporary item: {e}");
                None
            }
        }
    }
}

/// Scope guard returned by [`DynamicContext::enter`].
pub struct ActiveContext<'a, 'h> {
    dynamic: &'a DynamicContext<'h>,
    ctx: &'a mut RenderContext,
    handle: Option<ContextHandle>,
}

impl ActiveContext<'_, '_> {
    pub fn is_active(&self) -> bool {
        self.handle.as_ref().is_some_and(ContextHandle::is_active)
    }
}

impl Deref for ActiveContext<'_, '_> {
    type Target = RenderContext;

    fn deref(&self) -> &RenderContext {
        self.ctx
    }
}

impl DerefMut for ActiveContext<'_, '_> {
    fn deref_mut(&mut self) -> &mut RenderContext {
        self.ctx
    }
}

impl Drop for ActiveContext<'_, '_> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.dynamic.deactivate(self.ctx, handle);
        }
    }
}
