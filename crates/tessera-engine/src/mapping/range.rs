use std::cmp::Ordering;

use tessera_model::Range;

use super::{PointOptions, RangeOptions, SearchDirection};
use crate::editor::Editor;
use crate::error::EditorError;
use crate::surface::{
    ElementData, SelectionSource, Surface, SurfaceNodeId, SurfacePoint, SurfaceRange,
};

/// Raw anchor and focus pulled out of a host selection
struct Endpoints {
    anchor: SurfacePoint,
    focus: SurfacePoint,
    collapsed: bool,
}

impl Editor {
    /// Surface range covering a model range, ordered start to end with the
    /// direction kept in `backward`
    pub fn to_surface_range(
        &self,
        surface: &Surface,
        range: &Range,
    ) -> Result<SurfaceRange, EditorError> {
        let anchor = self.to_surface_point(surface, &range.anchor)?;
        let focus = if range.is_collapsed() {
            anchor
        } else {
            self.to_surface_point(surface, &range.focus)?
        };

        let backward = range.is_backward();
        let (start, end) = if backward {
            (focus, anchor)
        } else {
            (anchor, focus)
        };

        // Inside a placeholder the caret goes after the marker
        let at_zero_width = |point: SurfacePoint| {
            let element = if surface.is_element(point.node) {
                Some(point.node)
            } else {
                surface.parent(point.node)
            };
            let zero_width = element
                .and_then(|e| surface.element(e))
                .is_some_and(ElementData::is_zero_width);
            if zero_width {
                SurfacePoint::new(point.node, 1)
            } else {
                point
            }
        };

        Ok(SurfaceRange {
            start: at_zero_width(start),
            end: at_zero_width(end),
            backward,
        })
    }

    /// Model range for a host selection or native range
    pub fn to_model_range<'a>(
        &self,
        surface: &Surface,
        source: impl Into<SelectionSource<'a>>,
        options: RangeOptions,
    ) -> Result<Option<Range>, EditorError> {
        let Some(mut endpoints) = self.endpoints(surface, source.into()) else {
            return if options.suppress_throw {
                Ok(None)
            } else {
                Err(EditorError::SelectionResolution)
            };
        };

        if self.options().quirks.trailing_line_break {
            let focus = endpoints.focus;
            let content = surface.text_content(focus.node);
            if content.ends_with("\n\n") && focus.offset == content.chars().count() {
                endpoints.focus.offset -= 1;
            }
        }

        let Endpoints {
            anchor: raw_anchor,
            focus: raw_focus,
            collapsed,
        } = endpoints;
        let point_options = PointOptions {
            exact_match: options.exact_match,
            suppress_throw: options.suppress_throw,
            search_direction: SearchDirection::Backward,
        };

        let Some(anchor) = self.to_model_point(surface, raw_anchor, point_options)? else {
            return Ok(None);
        };
        let focus = if collapsed {
            anchor.clone()
        } else {
            let focus_before_anchor = match surface.compare(raw_focus.node, raw_anchor.node) {
                Ordering::Less => true,
                Ordering::Equal => raw_focus.offset < raw_anchor.offset,
                Ordering::Greater => false,
            };
            let search_direction = if focus_before_anchor {
                SearchDirection::Forward
            } else {
                SearchDirection::Backward
            };
            let focus_options = PointOptions {
                search_direction,
                ..point_options
            };
            match self.to_model_point(surface, raw_focus, focus_options)? {
                Some(focus) => focus,
                None => return Ok(None),
            }
        };

        let range = Range::new(anchor, focus);
        // A selection ending on an element boundary right before a void only
        // touches it
        if range.is_expanded()
            && range.is_forward()
            && surface.is_element(raw_focus.node)
            && self.document.highest_void(&range.focus.path).is_some()
        {
            return Ok(Some(self.document.unhang_range(&range, true)));
        }
        Ok(Some(range))
    }

    fn endpoints(&self, surface: &Surface, source: SelectionSource<'_>) -> Option<Endpoints> {
        match source {
            SelectionSource::Range(range) => {
                let (anchor, focus) = range.anchor_and_focus();
                Some(Endpoints {
                    anchor,
                    focus,
                    collapsed: range.is_collapsed(),
                })
            }
            SelectionSource::Selection(selection) => {
                let collapsed = selection.is_collapsed();
                let (anchor, focus) = match selection.ranges.as_slice() {
                    [first, .., last] if self.options().quirks.multi_range_selection => {
                        multi_range_endpoints(surface, selection.focus, first, last)?
                    }
                    _ => (selection.anchor, selection.focus),
                };
                Some(Endpoints {
                    anchor,
                    focus,
                    collapsed,
                })
            }
        }
    }
}

/// Anchor and focus of a selection the host split into one native range per
/// row
fn multi_range_endpoints(
    surface: &Surface,
    focus: SurfacePoint,
    first: &SurfaceRange,
    last: &SurfaceRange,
) -> Option<(SurfacePoint, SurfacePoint)> {
    let rows = [focus.node, first.start.node, last.start.node];
    if rows.iter().all(|row| surface.is_element(*row)) {
        let first_cell = innermost(surface, first.start)?;
        let last_cell = innermost(surface, last.start)?;

        let anchor_node = surface.children(last_cell).first().copied().unwrap_or(last_cell);
        let focus_node = surface.children(first_cell).first().copied().unwrap_or(first_cell);
        return Some((
            SurfacePoint::new(anchor_node, surface.text_len(last_cell)),
            SurfacePoint::new(focus_node, 0),
        ));
    }

    if first.start.node == focus.node {
        Some((last.end, SurfacePoint::new(focus.node, first.start.offset)))
    } else {
        Some((
            SurfacePoint::new(first.start.node, first.end.offset),
            SurfacePoint::new(focus.node, last.start.offset),
        ))
    }
}

/// The element child at a row boundary, followed down its first element
/// children
fn innermost(surface: &Surface, boundary: SurfacePoint) -> Option<SurfaceNodeId> {
    let mut node = *surface.element_children(boundary.node).get(boundary.offset)?;
    while let Some(child) = surface.element_children(node).first() {
        node = *child;
    }
    Some(node)
}
