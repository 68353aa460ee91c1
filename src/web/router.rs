//! Ordered route table.
//!
//! Patterns are tried in the order they were added and the first match wins,
//! even when a later pattern would match more specifically. Paths are matched
//! with leading slashes removed; runs of slashes between segments count as
//! one separator.

/// Characters a captured segment may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charset {
    /// `[a-zA-Z]+`
    Letters,
    /// `[a-zA-Z._]+`
    Name,
}

impl Charset {
    fn accepts(self, segment: &str) -> bool {
        !segment.is_empty()
            && segment.chars().all(|c| match self {
                Charset::Letters => c.is_ascii_alphabetic(),
                Charset::Name => c.is_ascii_alphabetic() || c == '.' || c == '_',
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    Literal(&'static str),
    Capture(Charset),
    /// Captures when the next segment fits, otherwise yields an absent
    /// parameter without consuming anything.
    Optional(Charset),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    segments: Vec<Segment>,
    trailing_slash: bool,
}

impl Pattern {
    pub fn new(segments: Vec<Segment>) -> Self {
        Self {
            segments,
            trailing_slash: false,
        }
    }

    /// Also accept the path with trailing slashes.
    pub fn allow_trailing_slash(mut self) -> Self {
        self.trailing_slash = true;
        self
    }

    /// Match a path that already has its leading slashes stripped. Returns
    /// one entry per capturing segment, in pattern order.
    pub fn matches(&self, path: &str) -> Option<RouteParams> {
        if path.ends_with('/') && !self.trailing_slash {
            return None;
        }
        let mut parts = path.split('/').filter(|s| !s.is_empty()).peekable();
        let mut params = Vec::new();

        for segment in &self.segments {
            match *segment {
                Segment::Literal(lit) => {
                    if parts.next()? != lit {
                        return None;
                    }
                }
                Segment::Capture(charset) => {
                    let part = parts.next()?;
                    if !charset.accepts(part) {
                        return None;
                    }
                    params.push(Some(part.to_string()));
                }
                Segment::Optional(charset) => match parts.peek() {
                    Some(part) if charset.accepts(part) => {
                        params.push(Some(part.to_string()));
                        parts.next();
                    }
                    _ => params.push(None),
                },
            }
        }

        if parts.next().is_some() {
            return None;
        }
        Some(RouteParams(params))
    }
}

/// Captured path parameters, positionally, each possibly absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteParams(pub Vec<Option<String>>);

impl RouteParams {
    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).and_then(|p| p.as_deref())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug)]
pub struct RouteMatch<'a, H> {
    pub handler: &'a H,
    pub params: RouteParams,
}

#[derive(Debug, Clone)]
pub struct RouteTable<H> {
    routes: Vec<(Pattern, H)>,
}

impl<H> Default for RouteTable<H> {
    fn default() -> Self {
        Self { routes: Vec::new() }
    }
}

impl<H> RouteTable<H> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, pattern: Pattern, handler: H) -> Self {
        self.routes.push((pattern, handler));
        self
    }

    /// First route, in insertion order, whose pattern matches `path`.
    pub fn lookup(&self, path: &str) -> Option<RouteMatch<'_, H>> {
        let path = path.trim_start_matches('/');
        self.routes.iter().find_map(|(pattern, handler)| {
            pattern
                .matches(path)
                .map(|params| RouteMatch { handler, params })
        })
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Everything the web front end serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Index,
    Vos,
    Metrics,
    Totals,
    Pilots,
    Schedd,
    VosJson,
    CeGraph,
    VoGraph,
    MetricsGraph,
}

impl RouteTable<Endpoint> {
    /// The front end's routes, in priority order.
    pub fn standard() -> Self {
        use Charset::{Letters, Name};
        use Segment::{Capture, Literal, Optional};

        RouteTable::new()
            .route(Pattern::new(vec![]), Endpoint::Index)
            .route(
                Pattern::new(vec![Literal("vos")]).allow_trailing_slash(),
                Endpoint::Vos,
            )
            .route(
                Pattern::new(vec![Literal("metrics")]).allow_trailing_slash(),
                Endpoint::Metrics,
            )
            .route(
                Pattern::new(vec![Literal("json"), Literal("totals")]),
                Endpoint::Totals,
            )
            .route(
                Pattern::new(vec![Literal("json"), Literal("pilots")]),
                Endpoint::Pilots,
            )
            .route(
                Pattern::new(vec![Literal("json"), Literal("schedd")]),
                Endpoint::Schedd,
            )
            .route(
                Pattern::new(vec![Literal("json"), Literal("vos")]),
                Endpoint::VosJson,
            )
            .route(
                Pattern::new(vec![Literal("graphs"), Literal("ce"), Optional(Letters)])
                    .allow_trailing_slash(),
                Endpoint::CeGraph,
            )
            .route(
                Pattern::new(vec![
                    Literal("graphs"),
                    Literal("vos"),
                    Capture(Name),
                    Optional(Letters),
                ])
                .allow_trailing_slash(),
                Endpoint::VoGraph,
            )
            .route(
                Pattern::new(vec![
                    Literal("graphs"),
                    Literal("metrics"),
                    Capture(Name),
                    Capture(Name),
                    Optional(Letters),
                ])
                .allow_trailing_slash(),
                Endpoint::MetricsGraph,
            )
    }
}
