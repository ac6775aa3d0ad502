//! In-memory page with scripted behaviour.
//!
//! Elements are plain nodes registered under the locators a test expects
//! the scraper to use. Clicks, key presses and scrolling apply scripted
//! effects (navigation, revealing nodes, appending rows), and every
//! interaction is recorded so tests can assert on what the scraper did.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use anyhow::Result;

use super::{BrowserDriver, Locator};
use crate::location::normalize;

/// Handle to a scripted node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// Interactions recorded by [`ScriptedBrowser`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverAction {
    Goto(String),
    ScrollIntoView(NodeId),
    PointerClick(NodeId),
    DomClick(NodeId),
    Typed { node: NodeId, text: String },
    PressEnter(NodeId),
    ScrollToBottom,
}

#[derive(Debug, Clone)]
enum Effect {
    Navigate(String),
    Attach(NodeId),
    SubmitLogin,
}

#[derive(Debug, Clone)]
struct Node {
    text: String,
    value: String,
    visible: bool,
    attached: bool,
    interactive: bool,
    parent: Option<NodeId>,
    pointer_fails: bool,
    text_fails: bool,
    disabled_reads: u32,
    resets_after_fill: u32,
    replaced_by: Option<NodeId>,
    on_click: Vec<Effect>,
    on_enter: Vec<Effect>,
}

impl Node {
    fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            value: String::new(),
            visible: true,
            attached: true,
            interactive: false,
            parent: None,
            pointer_fails: false,
            text_fails: false,
            disabled_reads: 0,
            resets_after_fill: 0,
            replaced_by: None,
            on_click: Vec::new(),
            on_enter: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
struct LoginScript {
    email_field: NodeId,
    password_field: NodeId,
    email: String,
    password: String,
    success_url: String,
}

#[derive(Debug, Default)]
struct State {
    url: String,
    nodes: Vec<Node>,
    locators: HashMap<Locator, Vec<NodeId>>,
    children: HashMap<(NodeId, String), Vec<NodeId>>,
    growth: VecDeque<(NodeId, String, Vec<NodeId>)>,
    rerenders: VecDeque<(NodeId, NodeId)>,
    failed_url_reads: u32,
    redirects: HashMap<String, String>,
    login: Option<LoginScript>,
    actions: Vec<DriverAction>,
}

impl State {
    fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes
            .get(id.0)
            .ok_or_else(|| anyhow::anyhow!("unknown node {id:?}"))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes
            .get_mut(id.0)
            .ok_or_else(|| anyhow::anyhow!("unknown node {id:?}"))
    }

    fn attached(&self, id: NodeId) -> Result<&Node> {
        let node = self.node(id)?;
        if !node.attached {
            anyhow::bail!("node {id:?} is detached from the document");
        }
        Ok(node)
    }

    fn navigate(&mut self, url: &str) {
        let landed = self
            .redirects
            .get(&normalize(url))
            .cloned()
            .unwrap_or_else(|| url.to_string());
        self.url = landed;
    }

    fn apply(&mut self, effects: Vec<Effect>) -> Result<()> {
        for effect in effects {
            match effect {
                Effect::Navigate(url) => self.navigate(&url),
                Effect::Attach(id) => self.node_mut(id)?.attached = true,
                Effect::SubmitLogin => self.submit_login()?,
            }
        }
        Ok(())
    }

    fn submit_login(&mut self) -> Result<()> {
        let Some(login) = self.login.clone() else {
            return Ok(());
        };
        let email = self.node(login.email_field)?.value.clone();
        let password = self.node(login.password_field)?.value.clone();
        if email == login.email && password == login.password {
            self.url = login.success_url;
        }
        Ok(())
    }

    fn replace(&mut self, old: NodeId, new: NodeId) -> Result<()> {
        self.node_mut(old)?.attached = false;
        self.node_mut(new)?.attached = true;
        for ids in self.locators.values_mut() {
            for id in ids.iter_mut() {
                if *id == old {
                    *id = new;
                }
            }
        }
        if let Some(login) = self.login.as_mut() {
            if login.email_field == old {
                login.email_field = new;
            }
            if login.password_field == old {
                login.password_field = new;
            }
        }
        Ok(())
    }
}

/// Scripted [`BrowserDriver`] for tests and dry runs.
#[derive(Debug, Default)]
pub struct ScriptedBrowser {
    state: Mutex<State>,
}

impl ScriptedBrowser {
    /// Create a page sitting at `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(State {
                url: url.into(),
                ..State::default()
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Add a visible, attached node with the given text.
    pub fn element(&self, text: &str) -> NodeId {
        let mut state = self.state();
        state.nodes.push(Node::new(text));
        NodeId(state.nodes.len() - 1)
    }

    /// Add a node that is not yet part of the document.
    pub fn detached_element(&self, text: &str) -> NodeId {
        let id = self.element(text);
        self.with_node(id, |n| n.attached = false);
        id
    }

    fn with_node(&self, id: NodeId, f: impl FnOnce(&mut Node)) {
        if let Some(node) = self.state().nodes.get_mut(id.0) {
            f(node);
        }
    }

    /// Make `id` findable through `locator` (appended in document order).
    pub fn expose(&self, locator: &Locator, id: NodeId) {
        self.state()
            .locators
            .entry(locator.clone())
            .or_default()
            .push(id);
    }

    /// Register `ids` as descendants of `parent` matching `css`.
    pub fn add_children(&self, parent: NodeId, css: &str, ids: &[NodeId]) {
        self.state()
            .children
            .entry((parent, css.to_string()))
            .or_default()
            .extend_from_slice(ids);
    }

    /// Append `ids` under `parent` the next time the page is scrolled to the
    /// bottom. Batches are consumed one per scroll.
    pub fn queue_growth(&self, parent: NodeId, css: &str, ids: &[NodeId]) {
        self.state()
            .growth
            .push_back((parent, css.to_string(), ids.to_vec()));
    }

    /// On the next scroll to the bottom, swap `old` out of the document for
    /// `new`, as a re-render would.
    pub fn rerender_on_scroll(&self, old: NodeId, new: NodeId) {
        self.with_node(new, |n| n.attached = false);
        self.state().rerenders.push_back((old, new));
    }

    /// Make the next `reads` location reads fail.
    pub fn fail_url_reads(&self, reads: u32) {
        self.state().failed_url_reads = reads;
    }

    pub fn set_parent(&self, child: NodeId, parent: NodeId) {
        self.with_node(child, |n| n.parent = Some(parent));
    }

    /// Mark a node as a link/button.
    pub fn set_interactive(&self, id: NodeId) {
        self.with_node(id, |n| n.interactive = true);
    }

    pub fn set_hidden(&self, id: NodeId) {
        self.with_node(id, |n| n.visible = false);
    }

    /// Report a `disabled` attribute for the next `reads` attribute reads.
    pub fn disable_for_reads(&self, id: NodeId, reads: u32) {
        self.with_node(id, |n| n.disabled_reads = reads);
    }

    /// Make simulated pointer clicks on `id` fail.
    pub fn fail_pointer_clicks(&self, id: NodeId) {
        self.with_node(id, |n| n.pointer_fails = true);
    }

    /// Make reading the text of `id` fail.
    pub fn fail_text(&self, id: NodeId) {
        self.with_node(id, |n| n.text_fails = true);
    }

    /// Blank the field's value right after the next `times` fills.
    pub fn reset_after_fill(&self, id: NodeId, times: u32) {
        self.with_node(id, |n| n.resets_after_fill = times);
    }

    /// After the first fill of `old`, swap it out of the document for `new`.
    pub fn replace_after_fill(&self, old: NodeId, new: NodeId) {
        self.with_node(old, |n| n.replaced_by = Some(new));
        self.with_node(new, |n| n.attached = false);
    }

    pub fn on_click_navigate(&self, id: NodeId, url: &str) {
        self.with_node(id, |n| n.on_click.push(Effect::Navigate(url.to_string())));
    }

    pub fn on_click_attach(&self, id: NodeId, revealed: NodeId) {
        self.with_node(id, |n| n.on_click.push(Effect::Attach(revealed)));
    }

    /// Loading `from` lands on `to` instead.
    pub fn redirect(&self, from: &str, to: &str) {
        self.state()
            .redirects
            .insert(normalize(from), to.to_string());
    }

    /// Accept `email`/`password` when submitted from the given fields, moving
    /// to `success_url`. Enter on the password field submits; so does
    /// clicking any node passed to [`ScriptedBrowser::submit_on_click`].
    pub fn login_form(
        &self,
        email_field: NodeId,
        password_field: NodeId,
        email: &str,
        password: &str,
        success_url: &str,
    ) {
        let mut state = self.state();
        state.login = Some(LoginScript {
            email_field,
            password_field,
            email: email.to_string(),
            password: password.to_string(),
            success_url: success_url.to_string(),
        });
        if let Some(node) = state.nodes.get_mut(password_field.0) {
            node.on_enter.push(Effect::SubmitLogin);
        }
    }

    pub fn submit_on_click(&self, id: NodeId) {
        self.with_node(id, |n| n.on_click.push(Effect::SubmitLogin));
    }

    pub fn url(&self) -> String {
        self.state().url.clone()
    }

    pub fn actions(&self) -> Vec<DriverAction> {
        self.state().actions.clone()
    }

    /// URLs passed to `goto`, in order.
    pub fn navigations(&self) -> Vec<String> {
        self.state()
            .actions
            .iter()
            .filter_map(|a| match a {
                DriverAction::Goto(url) => Some(url.clone()),
                _ => None,
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl BrowserDriver for ScriptedBrowser {
    type Element = NodeId;

    async fn current_url(&self) -> Result<String> {
        let mut state = self.state();
        if state.failed_url_reads > 0 {
            state.failed_url_reads -= 1;
            anyhow::bail!("page location is not available yet");
        }
        Ok(state.url.clone())
    }

    async fn goto(&self, url: &str) -> Result<()> {
        let mut state = self.state();
        state.actions.push(DriverAction::Goto(url.to_string()));
        state.navigate(url);
        Ok(())
    }

    async fn find_all(&self, locator: &Locator) -> Result<Vec<NodeId>> {
        let state = self.state();
        let ids = state.locators.get(locator).cloned().unwrap_or_default();
        Ok(ids
            .into_iter()
            .filter(|id| state.node(*id).map(|n| n.attached).unwrap_or(false))
            .collect())
    }

    async fn find_within(&self, parent: &NodeId, css: &str) -> Result<Vec<NodeId>> {
        let state = self.state();
        state.attached(*parent)?;
        let ids = state
            .children
            .get(&(*parent, css.to_string()))
            .cloned()
            .unwrap_or_default();
        Ok(ids
            .into_iter()
            .filter(|id| state.node(*id).map(|n| n.attached).unwrap_or(false))
            .collect())
    }

    async fn text(&self, element: &NodeId) -> Result<String> {
        let state = self.state();
        let node = state.attached(*element)?;
        if node.text_fails {
            anyhow::bail!("text of {element:?} could not be read");
        }
        Ok(node.text.clone())
    }

    async fn value(&self, element: &NodeId) -> Result<String> {
        Ok(self.state().attached(*element)?.value.clone())
    }

    async fn attribute(&self, element: &NodeId, name: &str) -> Result<Option<String>> {
        let mut state = self.state();
        state.attached(*element)?;
        let node = state.node_mut(*element)?;
        if name == "disabled" && node.disabled_reads > 0 {
            node.disabled_reads -= 1;
            return Ok(Some(String::new()));
        }
        Ok(None)
    }

    async fn is_interactable(&self, element: &NodeId) -> Result<bool> {
        let state = self.state();
        let node = state.attached(*element)?;
        Ok(node.visible && node.disabled_reads == 0)
    }

    async fn scroll_into_view(&self, element: &NodeId) -> Result<()> {
        let mut state = self.state();
        state.attached(*element)?;
        state.actions.push(DriverAction::ScrollIntoView(*element));
        Ok(())
    }

    async fn interactive_target(&self, element: &NodeId) -> Result<NodeId> {
        let state = self.state();
        let mut current = Some(*element);
        while let Some(id) = current {
            let node = state.node(id)?;
            if node.interactive {
                return Ok(id);
            }
            current = node.parent;
        }
        Ok(*element)
    }

    async fn pointer_click(&self, element: &NodeId) -> Result<()> {
        let mut state = self.state();
        let node = state.attached(*element)?;
        if node.pointer_fails {
            anyhow::bail!("element {element:?} is not clickable at point");
        }
        let effects = node.on_click.clone();
        state.actions.push(DriverAction::PointerClick(*element));
        state.apply(effects)
    }

    async fn dom_click(&self, element: &NodeId) -> Result<()> {
        let mut state = self.state();
        let effects = state.attached(*element)?.on_click.clone();
        state.actions.push(DriverAction::DomClick(*element));
        state.apply(effects)
    }

    async fn clear_and_type(&self, element: &NodeId, text: &str) -> Result<()> {
        let mut state = self.state();
        state.attached(*element)?;
        state.actions.push(DriverAction::Typed {
            node: *element,
            text: text.to_string(),
        });
        let node = state.node_mut(*element)?;
        node.value = text.to_string();
        if node.resets_after_fill > 0 {
            node.resets_after_fill -= 1;
            node.value.clear();
        }
        if let Some(new) = node.replaced_by.take() {
            state.replace(*element, new)?;
        }
        Ok(())
    }

    async fn press_enter(&self, element: &NodeId) -> Result<()> {
        let mut state = self.state();
        let effects = state.attached(*element)?.on_enter.clone();
        state.actions.push(DriverAction::PressEnter(*element));
        state.apply(effects)
    }

    async fn scroll_to_bottom(&self) -> Result<()> {
        let mut state = self.state();
        state.actions.push(DriverAction::ScrollToBottom);
        if let Some((parent, css, ids)) = state.growth.pop_front() {
            state.children.entry((parent, css)).or_default().extend(ids);
        }
        if let Some((old, new)) = state.rerenders.pop_front() {
            state.replace(old, new)?;
        }
        Ok(())
    }
}
