//! Layout and placeholder lookup.
//!
//! Templates are user-authored and their layout names rarely match a request
//! exactly ("Two Content" vs "Two Content Layout"). Exact lookup comes first;
//! otherwise the closest name by similarity wins, so any template with at
//! least one layout always yields a usable layout.

use crate::config::ConfigError;
use crate::error::Result;
use crate::pptx::template::{Layout, Placeholder, PlaceholderKind, Template};

/// Similarity of two names in `[0, 1]`; symmetric, 1.0 for equal strings.
#[inline]
pub fn similarity(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(a, b)
}

/// The layout named exactly `name` (case-sensitive).
pub fn find_slide_layout_by_name<'t>(template: &'t Template, name: &str) -> Option<&'t Layout> {
    template.layouts().iter().find(|layout| layout.name() == name)
}

/// The layout whose name is most similar to `target`.
///
/// Ties go to the earliest layout in template order. `None` only when the
/// template has no layouts.
pub fn find_most_similar_layout<'t>(template: &'t Template, target: &str) -> Option<&'t Layout> {
    let mut best: Option<(&Layout, f64)> = None;
    for layout in template.layouts() {
        let score = similarity(layout.name(), target);
        if best.is_none_or(|(_, best_score)| score > best_score) {
            best = Some((layout, score));
        }
    }
    best.map(|(layout, _)| layout)
}

/// First body placeholder of a layout, never a title or picture.
pub fn find_content_placeholder(layout: &Layout) -> Option<&Placeholder> {
    layout
        .placeholders()
        .iter()
        .find(|ph| ph.kind == PlaceholderKind::Body)
}

/// Exact match, else the most similar layout.
pub fn resolve_layout<'t>(template: &'t Template, name: &str) -> Result<&'t Layout> {
    if let Some(layout) = find_slide_layout_by_name(template, name) {
        return Ok(layout);
    }
    let layout = find_most_similar_layout(template, name).ok_or(ConfigError::NoLayouts)?;
    tracing::debug!(requested = name, resolved = layout.name(), "no exact layout match, using closest");
    Ok(layout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SlideError;
    use crate::pptx::fixtures::{self, FixtureLayout};
    use proptest::prelude::*;

    fn template_with(layouts: &[FixtureLayout]) -> Template {
        Template::from_bytes(&fixtures::template(layouts, false, 0)).unwrap()
    }

    fn named(names: &[&'static str]) -> Template {
        let layouts: Vec<_> = names
            .iter()
            .map(|name| FixtureLayout::new(*name, &[Some("title"), None]))
            .collect();
        template_with(&layouts)
    }

    #[test]
    fn test_exact_lookup_is_case_sensitive() {
        let template = named(&["Title Slide", "Two Content"]);
        assert_eq!(
            find_slide_layout_by_name(&template, "Two Content").map(Layout::name),
            Some("Two Content")
        );
        assert!(find_slide_layout_by_name(&template, "two content").is_none());
        assert!(find_slide_layout_by_name(&template, "Comparison").is_none());
    }

    #[test]
    fn test_closest_layout_for_unknown_name() {
        let template = named(&["Title Slide", "Two Content"]);
        let layout = find_most_similar_layout(&template, "Two Content Layout").unwrap();
        assert_eq!(layout.name(), "Two Content");
        assert_eq!(resolve_layout(&template, "Two Content Layout").unwrap().name(), "Two Content");
    }

    #[test]
    fn test_tie_goes_to_first_layout() {
        // Both are one edit away from the target
        let template = named(&["Layout A", "Layout B"]);
        assert_eq!(find_most_similar_layout(&template, "Layout C").unwrap().name(), "Layout A");

        let template = named(&["Layout B", "Layout A"]);
        assert_eq!(find_most_similar_layout(&template, "Layout C").unwrap().name(), "Layout B");
    }

    #[test]
    fn test_no_layouts() {
        let template = named(&[]);
        assert!(find_most_similar_layout(&template, "Title and Content").is_none());
        assert!(matches!(resolve_layout(&template, "Title and Content"), Err(SlideError::Config(ConfigError::NoLayouts))));
    }

    #[test]
    fn test_content_placeholder_skips_title_and_picture() {
        let template = template_with(&[
            FixtureLayout::new("Picture with Caption", &[Some("title"), Some("pic"), Some("body")]),
            FixtureLayout::new("Title Only", &[Some("title"), Some("dt"), Some("sldNum")]),
            FixtureLayout::new("Blank", &[]),
            FixtureLayout::new("Title Slide", &[Some("ctrTitle"), Some("subTitle")]),
        ]);
        let layouts = template.layouts();

        let body = find_content_placeholder(&layouts[0]).unwrap();
        assert_eq!(body.kind, PlaceholderKind::Body);
        assert_eq!(body.position, 2);
        assert!(find_content_placeholder(&layouts[1]).is_none());
        assert!(find_content_placeholder(&layouts[2]).is_none());
        assert_eq!(
            find_content_placeholder(&layouts[3]).and_then(|ph| ph.ph_type.as_deref()),
            Some("subTitle")
        );
    }

    #[test]
    fn test_content_placeholder_belongs_to_layout() {
        let template = template_with(&fixtures::standard_layouts());
        for layout in template.layouts() {
            if let Some(ph) = find_content_placeholder(layout) {
                assert!(layout.placeholders().iter().any(|own| std::ptr::eq(own, ph)));
            }
        }
    }

    #[test]
    fn test_unnamed_layout_is_still_a_candidate() {
        let template = template_with(&[FixtureLayout::unnamed(&[None])]);
        assert_eq!(find_most_similar_layout(&template, "Anything").unwrap().name(), "");
    }

    proptest! {
        #[test]
        fn prop_similarity_symmetric_and_bounded(a in "\\PC{0,24}", b in "\\PC{0,24}") {
            let ab = similarity(&a, &b);
            prop_assert!((0.0..=1.0).contains(&ab));
            prop_assert_eq!(ab, similarity(&b, &a));
        }

        #[test]
        fn prop_self_similarity_is_one(a in "\\PC{1,24}") {
            prop_assert_eq!(similarity(&a, &a), 1.0);
        }

        #[test]
        fn prop_most_similar_is_member(
            names in prop::collection::vec("[A-Za-z ]{0,16}", 1..6),
            target in "[A-Za-z ]{1,20}",
        ) {
            let layouts: Vec<Layout> = names
                .iter()
                .enumerate()
                .map(|(i, name)| {
                    let partname = crate::opc::PackURI::new(format!("/ppt/slideLayouts/slideLayout{}.xml", i + 1)).unwrap();
                    Layout::new(name.clone(), partname, Vec::new())
                })
                .collect();
            let best = layouts
                .iter()
                .fold(None::<(&Layout, f64)>, |best, layout| {
                    let score = similarity(layout.name(), &target);
                    match best {
                        Some((_, s)) if s >= score => best,
                        _ => Some((layout, score)),
                    }
                })
                .map(|(layout, _)| layout.partname().clone());

            let template = Template::from_layouts(layouts.clone());
            let found = find_most_similar_layout(&template, &target).unwrap();
            prop_assert!(template.layouts().iter().any(|l| std::ptr::eq(l, found)));
            prop_assert_eq!(Some(found.partname().clone()), best);
        }
    }
}
