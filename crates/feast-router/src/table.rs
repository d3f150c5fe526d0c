//! The ordered route table.
//!
//! Routes are kept in registration order and tried in that order. The first
//! route whose pattern matches the path is final: if none of its entries
//! accepts the request method the lookup reports [`Lookup::MethodNotAllowed`]
//! and later routes are never consulted, even if they would also match.

use crate::{Captures, EntryFlags, MethodMask, Pattern, PatternError};

/// One `(callback, methods, flags)` binding inside a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerEntry {
    callback: String,
    methods: MethodMask,
    flags: EntryFlags,
}

impl HandlerEntry {
    /// Binds `callback` to the verbs in `methods`.
    #[must_use]
    pub fn new(callback: impl Into<String>, methods: MethodMask) -> Self {
        Self {
            callback: callback.into(),
            methods,
            flags: EntryFlags::NONE,
        }
    }

    /// Replaces the entry flags.
    #[must_use]
    pub fn with_flags(mut self, flags: EntryFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Sets [`EntryFlags::ACCEPT_JSON_BODY`].
    #[must_use]
    pub fn accept_json(mut self) -> Self {
        self.flags = self.flags | EntryFlags::ACCEPT_JSON_BODY;
        self
    }

    /// Sets [`EntryFlags::HIDDEN`].
    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.flags = self.flags | EntryFlags::HIDDEN;
        self
    }

    /// Name of the handler this entry resolves to.
    #[must_use]
    pub fn callback(&self) -> &str {
        &self.callback
    }

    /// Accepted verbs.
    #[must_use]
    pub fn methods(&self) -> MethodMask {
        self.methods
    }

    /// Entry flags.
    #[must_use]
    pub fn flags(&self) -> EntryFlags {
        self.flags
    }

    /// Whether the JSON body should be merged into the arguments.
    #[must_use]
    pub fn accepts_json_body(&self) -> bool {
        self.flags.contains(EntryFlags::ACCEPT_JSON_BODY)
    }

    /// Whether the entry is left out of the route index.
    #[must_use]
    pub fn is_hidden(&self) -> bool {
        self.flags.contains(EntryFlags::HIDDEN)
    }
}

/// A compiled pattern and its entries, in declaration order.
#[derive(Debug, Clone)]
pub struct Route {
    pattern: Pattern,
    entries: Vec<HandlerEntry>,
}

impl Route {
    /// Creates a route with no entries yet.
    pub fn new(template: &str) -> Result<Self, PatternError> {
        Ok(Self {
            pattern: Pattern::compile(template)?,
            entries: Vec::new(),
        })
    }

    /// Appends an entry.
    #[must_use]
    pub fn entry(mut self, entry: HandlerEntry) -> Self {
        self.entries.push(entry);
        self
    }

    /// Appends an entry in place.
    pub fn push(&mut self, entry: HandlerEntry) {
        self.entries.push(entry);
    }

    /// The compiled pattern.
    #[must_use]
    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    /// The template string, also the route's key in the table.
    #[must_use]
    pub fn template(&self) -> &str {
        self.pattern.template()
    }

    /// Entries in declaration order.
    #[must_use]
    pub fn entries(&self) -> &[HandlerEntry] {
        &self.entries
    }

    /// Mutable access for extensions that rewrite entries.
    pub fn entries_mut(&mut self) -> &mut Vec<HandlerEntry> {
        &mut self.entries
    }

    /// First entry accepting `method`.
    #[must_use]
    pub fn select(&self, method: MethodMask) -> Option<&HandlerEntry> {
        self.entries.iter().find(|e| e.methods.accepts(method))
    }
}

/// A successful lookup.
#[derive(Debug, Clone)]
pub struct RouteMatch<'a> {
    /// The matching route.
    pub route: &'a Route,
    /// The first entry accepting the request method.
    pub entry: &'a HandlerEntry,
    /// Path captures.
    pub captures: Captures,
}

/// Result of [`RouteTable::lookup`].
#[derive(Debug, Clone)]
pub enum Lookup<'a> {
    /// A route matched and one of its entries accepts the method.
    Matched(RouteMatch<'a>),
    /// The first matching route has no entry for the method.
    MethodNotAllowed {
        /// The route that matched the path.
        route: &'a Route,
    },
    /// No pattern matched the path.
    NotFound,
}

/// Public listing of one visible entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDescription {
    /// Route template.
    pub pattern: String,
    /// Accepted verb names.
    pub methods: Vec<&'static str>,
    /// Whether a JSON body is merged.
    pub accepts_json: bool,
}

/// Routes in registration order.
///
/// # Example
///
/// ```rust
/// use feast_router::{HandlerEntry, Lookup, MethodMask, Route, RouteTable};
///
/// let mut table = RouteTable::new();
/// table.insert(
///     Route::new("/feeds/{id}")
///         .unwrap()
///         .entry(HandlerEntry::new("feeds.get", MethodMask::READABLE))
///         .entry(HandlerEntry::new("feeds.edit", MethodMask::EDITABLE).accept_json()),
/// );
///
/// match table.lookup(MethodMask::PATCH, "/feeds/7") {
///     Lookup::Matched(m) => {
///         assert_eq!(m.entry.callback(), "feeds.edit");
///         assert_eq!(m.captures.get("id"), Some("7"));
///     }
///     other => panic!("unexpected {other:?}"),
/// }
///
/// assert!(matches!(table.lookup(MethodMask::DELETE, "/feeds/7"), Lookup::MethodNotAllowed { .. }));
/// assert!(matches!(table.lookup(MethodMask::GET, "/nope"), Lookup::NotFound));
/// ```
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a route at the end, or replaces the route with the same
    /// template where it stands. Returns the replaced route.
    pub fn insert(&mut self, route: Route) -> Option<Route> {
        match self.position(route.template()) {
            Some(idx) => Some(std::mem::replace(&mut self.routes[idx], route)),
            None => {
                self.routes.push(route);
                None
            }
        }
    }

    /// Builder form of [`RouteTable::insert`].
    #[must_use]
    pub fn with(mut self, route: Route) -> Self {
        self.insert(route);
        self
    }

    /// Removes the route registered under `template`.
    pub fn remove(&mut self, template: &str) -> Option<Route> {
        self.position(template).map(|idx| self.routes.remove(idx))
    }

    /// Route registered under `template`.
    #[must_use]
    pub fn get(&self, template: &str) -> Option<&Route> {
        self.routes.iter().find(|r| r.template() == template)
    }

    /// Mutable route registered under `template`.
    pub fn get_mut(&mut self, template: &str) -> Option<&mut Route> {
        self.routes.iter_mut().find(|r| r.template() == template)
    }

    /// Routes in order.
    pub fn iter(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter()
    }

    /// Mutable routes in order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Route> {
        self.routes.iter_mut()
    }

    /// Number of routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns true when no routes are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Resolves a normalised method and a path.
    #[must_use]
    pub fn lookup(&self, method: MethodMask, path: &str) -> Lookup<'_> {
        for route in &self.routes {
            let Some(captures) = route.pattern.captures(path) else {
                continue;
            };
            return match route.select(method) {
                Some(entry) => Lookup::Matched(RouteMatch {
                    route,
                    entry,
                    captures,
                }),
                None => Lookup::MethodNotAllowed { route },
            };
        }
        Lookup::NotFound
    }

    /// Lists every entry not flagged [`EntryFlags::HIDDEN`].
    #[must_use]
    pub fn describe(&self) -> Vec<RouteDescription> {
        self.routes
            .iter()
            .flat_map(|route| {
                route
                    .entries
                    .iter()
                    .filter(|e| !e.is_hidden())
                    .map(move |e| RouteDescription {
                        pattern: route.template().to_string(),
                        methods: e.methods.names().collect(),
                        accepts_json: e.accepts_json_body(),
                    })
            })
            .collect()
    }

    fn position(&self, template: &str) -> Option<usize> {
        self.routes.iter().position(|r| r.template() == template)
    }
}

impl<'a> IntoIterator for &'a RouteTable {
    type Item = &'a Route;
    type IntoIter = std::slice::Iter<'a, Route>;

    fn into_iter(self) -> Self::IntoIter {
        self.routes.iter()
    }
}

/// Hook that may add, replace, remove or rewrite routes before the table
/// is handed to the dispatcher.
pub trait RouteExtension: Send + Sync {
    /// Returns the extended table.
    fn extend(&self, table: RouteTable) -> RouteTable;
}

impl<F> RouteExtension for F
where
    F: Fn(RouteTable) -> RouteTable + Send + Sync,
{
    fn extend(&self, table: RouteTable) -> RouteTable {
        self(table)
    }
}

/// Applies each extension to `base`, in order.
#[must_use]
pub fn compose<'a>(
    base: RouteTable,
    extensions: impl IntoIterator<Item = &'a dyn RouteExtension>,
) -> RouteTable {
    extensions
        .into_iter()
        .fold(base, |table, extension| extension.extend(table))
}
