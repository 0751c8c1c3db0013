use chrono::{DateTime, Local, Utc};

use super::{AnnotationItem, AnnotationTree, ChapterHeader, ChapterSection, MarkerStyle};
use crate::annotations::{Annotation, AnnotationMarker};
use crate::config::UiOptions;
use crate::highlighter::hex_to_rgba;
use crate::publication::{strip_fragment, DocumentModel, Link, Locator};

/// Group annotations under the reading-order chapters that own them
pub fn build_tree(
    document: &dyn DocumentModel,
    annotations: &[Annotation],
    ui: &UiOptions,
) -> AnnotationTree {
    let mut tree = AnnotationTree::default();
    walk(document, document.reading_order(), 0, annotations, ui, &mut tree);
    tree
}

fn walk(
    document: &dyn DocumentModel,
    links: &[Link],
    depth: usize,
    annotations: &[Annotation],
    ui: &UiOptions,
    tree: &mut AnnotationTree,
) {
    for link in links {
        let absolute = link
            .href
            .as_deref()
            .and_then(|href| document.absolute_href(href));

        if let Some(absolute) = absolute.as_deref() {
            let items: Vec<AnnotationItem> = annotations
                .iter()
                .filter(|a| strip_fragment(&a.href) == strip_fragment(absolute))
                .map(|a| item(document, a, ui))
                .collect();

            if !items.is_empty() {
                tree.sections.push(ChapterSection {
                    depth,
                    header: header(document, link, absolute),
                    items,
                });
            }
        }

        // Children are visited whether or not the parent matched
        walk(document, &link.children, depth + 1, annotations, ui, tree);
    }
}

fn header(document: &dyn DocumentModel, link: &Link, absolute: &str) -> ChapterHeader {
    let title = document
        .toc_item_absolute(absolute)
        .and_then(|entry| entry.title)
        .or_else(|| link.title.clone())
        .unwrap_or_default();

    let mut locator = Locator::start_of(absolute);
    locator.media_type = link.media_type.clone();
    locator.title = Some(title.clone());

    ChapterHeader {
        href: absolute.to_string(),
        title,
        locator,
    }
}

fn item(document: &dyn DocumentModel, annotation: &Annotation, ui: &UiOptions) -> AnnotationItem {
    let color = hex_to_rgba(&annotation.color).unwrap_or_else(|| annotation.color.clone());
    let style = match annotation.marker {
        AnnotationMarker::Underline => MarkerStyle::Underline { border: color },
        AnnotationMarker::Highlight => MarkerStyle::Fill { background: color },
    };

    let mut locator = annotation.locator();
    if let Some(absolute) = document.absolute_href(&annotation.href) {
        locator.href = absolute;
    }

    AnnotationItem {
        id: annotation.id.clone(),
        preview: annotation.text.highlight.clone(),
        style,
        progression_label: progression_label(annotation.progression()),
        timestamp: readable_timestamp(&annotation.created),
        locator,
        deletable: ui.allows_delete(),
        annotation: annotation.clone(),
    }
}

fn progression_label(progression: f64) -> String {
    format!("{}% through resource", (progression * 100.0).round() as i64)
}

/// Creation time in the reader's local zone, e.g. "Mon Oct 19 2026 14:03:07"
pub fn readable_timestamp(created: &DateTime<Utc>) -> String {
    created
        .with_timezone(&Local)
        .format("%a %b %d %Y %H:%M:%S")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::test_annotation;
    use crate::publication::{Manifest, Publication};
    use crate::sidebar::SidebarAction;

    const BASE: &str = "https://example.org/book/manifest.json";

    fn publication() -> Publication {
        let manifest = Manifest {
            reading_order: vec![
                Link::new("intro.xhtml", "Intro"),
                Link::section(
                    "Part One",
                    vec![Link::new("ch1.xhtml", "One")
                        .with_children(vec![Link::new("ch1-1.xhtml", "One point one")])],
                ),
                Link::new("ch2.xhtml#top", "Two"),
            ],
            toc: vec![Link::new("ch2.xhtml", "Chapter Two")],
            ..Default::default()
        };
        Publication::new(BASE, manifest).unwrap()
    }

    fn abs(path: &str) -> String {
        format!("https://example.org/book/{path}")
    }

    #[test]
    fn test_empty_chapters_are_pruned() {
        let annotations = vec![test_annotation("a", &abs("ch2.xhtml"))];
        let tree = build_tree(&publication(), &annotations, &UiOptions::default());

        assert_eq!(tree.sections.len(), 1);
        assert_eq!(tree.sections[0].header.title, "Chapter Two");
        assert_eq!(tree.item_count(), 1);
    }

    #[test]
    fn test_nested_matches_keep_depth() {
        let annotations = vec![
            test_annotation("a", &abs("ch1-1.xhtml")),
            test_annotation("b", &abs("ch1.xhtml")),
        ];
        let tree = build_tree(&publication(), &annotations, &UiOptions::default());

        let depths: Vec<usize> = tree.sections.iter().map(|s| s.depth).collect();
        assert_eq!(depths, vec![1, 2]);
        assert_eq!(tree.sections[0].items[0].id, "b");
        assert_eq!(tree.sections[1].header.title, "One point one");
    }

    #[test]
    fn test_fragments_are_ignored_when_matching() {
        let annotations = vec![test_annotation("a", &abs("ch2.xhtml#p4"))];
        let tree = build_tree(&publication(), &annotations, &UiOptions::default());
        assert_eq!(tree.item_count(), 1);
        let header = &tree.sections[0].header;
        assert_eq!(header.href, abs("ch2.xhtml#top"));
        assert_eq!(header.locator.locations.progression, Some(0.0));
        assert_eq!(header.locator.title.as_deref(), Some("Chapter Two"));
    }

    #[test]
    fn test_item_presentation() {
        let mut underline = test_annotation("a", &abs("intro.xhtml"));
        underline.marker = AnnotationMarker::Underline;
        underline.locations.progression = 0.426;
        let mut odd_color = test_annotation("b", &abs("intro.xhtml"));
        odd_color.color = "tomato".to_string();

        let tree = build_tree(&publication(), &[underline, odd_color], &UiOptions::default());
        let items = &tree.sections[0].items;

        assert_eq!(
            items[0].style,
            MarkerStyle::Underline {
                border: "rgba(255,0,0,0.5)".to_string()
            }
        );
        assert_eq!(items[0].progression_label, "43% through resource");
        assert_eq!(items[0].preview, "text of a");
        assert_eq!(
            items[1].style,
            MarkerStyle::Fill {
                background: "tomato".to_string()
            }
        );
    }

    #[test]
    fn test_delete_visibility_follows_ui_mode() {
        let annotations = vec![test_annotation("a", &abs("intro.xhtml"))];
        let material = UiOptions {
            material: true,
            side_nav_expanded: false,
        };
        let tree = build_tree(&publication(), &annotations, &material);
        let item = &tree.sections[0].items[0];
        assert!(!item.deletable);
        assert!(item.delete_action().is_none());

        let tree = build_tree(&publication(), &annotations, &UiOptions::default());
        let item = &tree.sections[0].items[0];
        assert!(matches!(item.delete_action(), Some(SidebarAction::Delete(a)) if a.id == "a"));
        assert!(matches!(
            item.navigate_action(),
            SidebarAction::Navigate(l) if l.href == abs("intro.xhtml")
        ));
    }

    #[test]
    fn test_readable_timestamp_format() {
        // Noon UTC stays on the same date in every zone from -11:00 to +11:00
        let created = DateTime::parse_from_rfc3339("2024-03-05T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let formatted = readable_timestamp(&created);

        assert!(formatted.starts_with("Tue Mar 05 2024 "), "{formatted}");
        let time = formatted.rsplit(' ').next().unwrap();
        assert_eq!(time.len(), 8);
        assert_eq!(time.matches(':').count(), 2);
        assert!(time.ends_with(":00:00"));
    }
}
