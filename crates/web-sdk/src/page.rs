//! Host page model: the slice of the browser the tracker talks to.
//!
//! An embedding (wasm shim, replay harness, tests) mirrors the document
//! into a [`Page`], forwards DOM events through [`Page::dispatch`], and
//! installs the collector once its script has loaded.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use url::Url;

use trackwire_core::{Collector, TrackResult};

/// Handle to an element in a [`Page`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub tag: String,
    pub attributes: BTreeMap<String, String>,
    pub parent: Option<NodeId>,
}

impl Element {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }
}

/// Window scroll metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub scroll_y: f64,
    pub scroll_height: f64,
    pub inner_height: f64,
}

/// A cross-origin `message` event.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageEvent {
    pub origin: String,
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DomEvent {
    Submit { form: NodeId },
    Scroll,
    Message(MessageEvent),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Submit,
    Scroll,
    Message,
}

impl DomEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            DomEvent::Submit { .. } => EventKind::Submit,
            DomEvent::Scroll => EventKind::Scroll,
            DomEvent::Message(_) => EventKind::Message,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventTarget {
    Window,
    Element(NodeId),
}

pub type Listener = Arc<dyn Fn(&DomEvent) + Send + Sync>;

struct Registration {
    target: EventTarget,
    kind: EventKind,
    listener: Listener,
}

struct Document {
    location: Url,
    elements: Vec<Element>,
    viewport: Viewport,
}

/// In-memory page: document, window metrics, listeners and collector slot.
pub struct Page {
    document: RwLock<Document>,
    listeners: Mutex<Vec<Registration>>,
    collector: RwLock<Option<Arc<dyn Collector>>>,
}

impl Page {
    pub fn new(location: &str) -> TrackResult<Self> {
        Ok(Self {
            document: RwLock::new(Document {
                location: Url::parse(location)?,
                elements: Vec::new(),
                viewport: Viewport::default(),
            }),
            listeners: Mutex::new(Vec::new()),
            collector: RwLock::new(None),
        })
    }

    pub fn location(&self) -> Url {
        self.document.read().location.clone()
    }

    // ─── Document ───────────────────────────────────────────────────────

    pub fn create_element(&self, tag: &str, parent: Option<NodeId>) -> NodeId {
        let mut doc = self.document.write();
        doc.elements.push(Element {
            tag: tag.to_ascii_lowercase(),
            attributes: BTreeMap::new(),
            parent,
        });
        NodeId(doc.elements.len() - 1)
    }

    pub fn set_attribute(&self, node: NodeId, name: &str, value: impl Into<String>) {
        if let Some(el) = self.document.write().elements.get_mut(node.0) {
            el.attributes.insert(name.to_string(), value.into());
        }
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.document
            .read()
            .elements
            .get(node.0)
            .and_then(|el| el.attr(name).map(str::to_string))
    }

    pub fn element(&self, node: NodeId) -> Option<Element> {
        self.document.read().elements.get(node.0).cloned()
    }

    /// Elements matching `predicate`, in document order.
    pub fn find_all(&self, predicate: impl Fn(&Element) -> bool) -> Vec<NodeId> {
        self.document
            .read()
            .elements
            .iter()
            .enumerate()
            .filter(|(_, el)| predicate(el))
            .map(|(i, _)| NodeId(i))
            .collect()
    }

    pub fn find_first(&self, predicate: impl Fn(&Element) -> bool) -> Option<NodeId> {
        self.document
            .read()
            .elements
            .iter()
            .position(predicate)
            .map(NodeId)
    }

    pub fn elements_by_tag(&self, tag: &str) -> Vec<NodeId> {
        self.find_all(|el| el.tag.eq_ignore_ascii_case(tag))
    }

    pub fn first_by_class(&self, class: &str) -> Option<NodeId> {
        self.find_first(|el| el.has_class(class))
    }

    /// Nearest element, starting at `node` itself, carrying `attribute`.
    pub fn closest_with_attribute(&self, node: NodeId, attribute: &str) -> Option<NodeId> {
        let doc = self.document.read();
        let mut current = Some(node);
        while let Some(id) = current {
            let el = doc.elements.get(id.0)?;
            if el.attributes.contains_key(attribute) {
                return Some(id);
            }
            current = el.parent;
        }
        None
    }

    // ─── Window ─────────────────────────────────────────────────────────

    pub fn viewport(&self) -> Viewport {
        self.document.read().viewport
    }

    pub fn set_viewport(&self, viewport: Viewport) {
        self.document.write().viewport = viewport;
    }

    /// Move the window and fire a `scroll` event.
    pub fn scroll_to(&self, scroll_y: f64) {
        self.document.write().viewport.scroll_y = scroll_y;
        self.dispatch(EventTarget::Window, &DomEvent::Scroll);
    }

    pub fn post_message(&self, origin: &str, data: serde_json::Value) {
        self.dispatch(
            EventTarget::Window,
            &DomEvent::Message(MessageEvent {
                origin: origin.to_string(),
                data,
            }),
        );
    }

    pub fn submit(&self, form: NodeId) {
        self.dispatch(EventTarget::Element(form), &DomEvent::Submit { form });
    }

    // ─── Collector slot ─────────────────────────────────────────────────

    pub fn install_collector(&self, collector: Arc<dyn Collector>) {
        *self.collector.write() = Some(collector);
    }

    pub fn collector(&self) -> Option<Arc<dyn Collector>> {
        self.collector.read().clone()
    }

    pub fn has_collector(&self) -> bool {
        self.collector.read().is_some()
    }

    // ─── Events ─────────────────────────────────────────────────────────

    pub fn add_event_listener(&self, target: EventTarget, kind: EventKind, listener: Listener) {
        self.listeners.lock().push(Registration {
            target,
            kind,
            listener,
        });
    }

    /// Run every listener registered for `target` and the event's kind, in
    /// registration order. Listeners run with no page lock held.
    pub fn dispatch(&self, target: EventTarget, event: &DomEvent) {
        let kind = event.kind();
        let matched: Vec<Listener> = self
            .listeners
            .lock()
            .iter()
            .filter(|r| r.target == target && r.kind == kind)
            .map(|r| r.listener.clone())
            .collect();

        for listener in matched {
            listener(event);
        }
    }
}
