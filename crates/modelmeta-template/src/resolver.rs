//! Template resolvers
//!
//! A resolver rewrites a template one segment at a time. Each segment is
//! resolved independently, seeing the original template, its position and
//! the [`StatementContext`]. Resolvers compose with
//! [`TemplateResolver::and_then`]: `a.and_then(b)` applies `a` to the whole
//! template, then `b` to the result.
//!
//! | resolver                      | placeholders                 | other segments            |
//! |-------------------------------|------------------------------|---------------------------|
//! | [`StatementContextResolver`]  | context value                | unchanged                 |
//! | [`WildcardResolver`]          | `*`                          | unchanged                 |
//! | [`ResourceDescriptionResolver`] | `*`                        | last and identity → `*`   |
//! | [`SecurityContextResolver`]   | identity → value, others `*` | unchanged                 |

use crate::context::StatementContext;
use crate::error::{TemplateError, TemplateResult};
use crate::placeholder::Placeholder;
use crate::segment::Segment;
use crate::template::AddressTemplate;

/// Resource types whose instances share one schema
const IDENTITY_KEYS: [&str; 5] = ["host", "server", "server-group", "server-config", "profile"];

/// Resource types whose instances each have their own schema
const SINGLETON_KEYS: [&str; 2] = ["subsystem", "core-service"];

/// Everything a resolver sees about one segment
#[derive(Debug, Clone, Copy)]
pub struct SegmentResolution<'a> {
    pub template: &'a AddressTemplate,
    pub segment: &'a Segment,
    pub index: usize,
    pub first: bool,
    pub last: bool,
    pub context: &'a StatementContext,
}

/// Rewrites templates segment by segment
pub trait TemplateResolver: Send + Sync {
    /// Replacement for one segment
    fn resolve_segment(&self, resolution: &SegmentResolution<'_>) -> Segment;

    /// Apply [`resolve_segment`](Self::resolve_segment) to every segment
    fn resolve(&self, template: &AddressTemplate, context: &StatementContext) -> AddressTemplate {
        let len = template.len();
        let segments = template
            .iter()
            .enumerate()
            .map(|(index, segment)| {
                self.resolve_segment(&SegmentResolution {
                    template,
                    segment,
                    index,
                    first: index == 0,
                    last: index + 1 == len,
                    context,
                })
            })
            .collect();
        AddressTemplate::from_segments(segments)
    }

    /// Apply `self`, then `next` to the result
    fn and_then<R: TemplateResolver>(self, next: R) -> AndThen<Self, R>
    where
        Self: Sized,
    {
        AndThen {
            first: self,
            second: next,
        }
    }
}

impl<F> TemplateResolver for F
where
    F: Fn(&SegmentResolution<'_>) -> Segment + Send + Sync,
{
    fn resolve_segment(&self, resolution: &SegmentResolution<'_>) -> Segment {
        self(resolution)
    }
}

/// Composition of two resolvers, see [`TemplateResolver::and_then`]
#[derive(Debug, Clone)]
pub struct AndThen<A, B> {
    first: A,
    second: B,
}

impl<A: TemplateResolver, B: TemplateResolver> TemplateResolver for AndThen<A, B> {
    fn resolve_segment(&self, resolution: &SegmentResolution<'_>) -> Segment {
        let intermediate = self.first.resolve(resolution.template, resolution.context);
        match intermediate.segments().get(resolution.index) {
            Some(segment) => self.second.resolve_segment(&SegmentResolution {
                template: &intermediate,
                segment,
                ..*resolution
            }),
            None => resolution.segment.clone(),
        }
    }

    fn resolve(&self, template: &AddressTemplate, context: &StatementContext) -> AddressTemplate {
        let intermediate = self.first.resolve(template, context);
        self.second.resolve(&intermediate, context)
    }
}

/// Fills placeholders from the statement context
#[derive(Debug, Clone, Copy, Default)]
pub struct StatementContextResolver;

impl TemplateResolver for StatementContextResolver {
    fn resolve_segment(&self, resolution: &SegmentResolution<'_>) -> Segment {
        resolution.context.resolve(resolution.segment)
    }
}

/// Replaces every remaining placeholder with `*`
#[derive(Debug, Clone, Copy, Default)]
pub struct WildcardResolver;

impl TemplateResolver for WildcardResolver {
    fn resolve_segment(&self, resolution: &SegmentResolution<'_>) -> Segment {
        let segment = resolution.segment;
        if segment.has_placeholder() {
            segment.to_wildcard()
        } else {
            segment.clone()
        }
    }
}

/// Key policy of the resource description registry
///
/// Schema is the same for all instances of a resource type, so every
/// placeholder, the identity segments (`host`, `server`, ...) and the last
/// segment are reduced to `*`. The last segment keeps its value for
/// singleton types such as `subsystem`, whose instances differ in schema.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResourceDescriptionResolver;

impl TemplateResolver for ResourceDescriptionResolver {
    fn resolve_segment(&self, resolution: &SegmentResolution<'_>) -> Segment {
        let segment = resolution.segment;
        if segment.has_placeholder() {
            return segment.to_wildcard();
        }
        let Some(key) = segment.key() else {
            return segment.clone();
        };
        let identity = IDENTITY_KEYS.contains(&key);
        let instance = resolution.last && !SINGLETON_KEYS.contains(&key);
        if identity || instance {
            segment.to_wildcard()
        } else {
            segment.clone()
        }
    }
}

/// Key policy of the security context registry
///
/// Permissions are scoped per host, server group and server, so the
/// identity placeholders resolve to their current value (`*` when unset).
/// All other placeholders, `{selection}` included, become `*`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SecurityContextResolver;

impl TemplateResolver for SecurityContextResolver {
    fn resolve_segment(&self, resolution: &SegmentResolution<'_>) -> Segment {
        let segment = resolution.segment;
        let Some(name) = segment.placeholder_name() else {
            return segment.clone();
        };
        let identity = Placeholder::lookup(name).is_some_and(Placeholder::is_identity);
        match resolution.context.value(name) {
            // an unwritable value stays a placeholder and fails conversion later
            Some(value) if identity => segment.with_value(value).unwrap_or_else(|_| segment.clone()),
            _ => segment.to_wildcard(),
        }
    }
}

/// Resolves everything from the context and rejects what is left
///
/// Placeholders that do not require a value (`{selection}`) fall back to
/// `*`; any other placeholder without value is an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct StrictResolver;

impl StrictResolver {
    pub fn try_resolve(
        &self,
        template: &AddressTemplate,
        context: &StatementContext,
    ) -> TemplateResult<AddressTemplate> {
        let resolved = StatementContextResolver.resolve(template, context);
        let mut segments = Vec::with_capacity(resolved.len());
        for segment in resolved.iter() {
            let Some(name) = segment.placeholder_name() else {
                segments.push(segment.clone());
                continue;
            };
            let optional = Placeholder::lookup(name).is_some_and(|p| !p.requires_value());
            if optional && segment.has_key() {
                segments.push(segment.to_wildcard());
            } else {
                return Err(TemplateError::UnresolvedPlaceholder {
                    template: template.to_string(),
                    placeholder: name.to_string(),
                });
            }
        }
        Ok(AddressTemplate::from_segments(segments))
    }
}
