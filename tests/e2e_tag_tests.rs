//! Tag mutations, tag search and information text.

mod common;

use common::*;
use sheetable_catalog::catalog_store::TagSet;
use sheetable_catalog::{CatalogError, CatalogStore, UploadRequest};

fn upload_with_tags(catalog: &TestCatalog, title: &str, tags: &str) {
    let request = UploadRequest {
        tags: tags.to_string(),
        ..UploadRequest::new(CHOPIN, title)
    };
    catalog.upload_request(&request).unwrap();
}

#[test]
fn test_append_and_remove_tags() {
    let catalog = TestCatalog::new();
    upload_with_tags(&catalog, "Nocturne", "Piano");

    let sheet = catalog.manager.append_tag("nocturne", " Romantic ").unwrap();
    assert_eq!(
        sheet.tag_set().unwrap(),
        TagSet::from_values(["Piano", "Romantic"])
    );

    let sheet = catalog.manager.remove_tag("nocturne", "Piano").unwrap();
    assert_eq!(sheet.tag_set().unwrap(), TagSet::from_values(["Romantic"]));

    let stored = catalog.manager.find_by_safe_name("nocturne").unwrap();
    assert_eq!(stored.tags, r#"["Romantic"]"#);
}

#[test]
fn test_append_is_idempotent() {
    let catalog = TestCatalog::new();
    upload_with_tags(&catalog, "Nocturne", "");

    catalog.manager.append_tag("nocturne", "Piano").unwrap();
    catalog.manager.append_tag("nocturne", "Piano").unwrap();

    let stored = catalog.manager.find_by_safe_name("nocturne").unwrap();
    assert_eq!(stored.tags, r#"["Piano"]"#);
}

#[test]
fn test_tag_errors_are_distinct() {
    let catalog = TestCatalog::new();
    upload_with_tags(&catalog, "Nocturne", "Piano");

    assert!(matches!(
        catalog.manager.append_tag("nocturne", "   "),
        Err(CatalogError::EmptyTag)
    ));
    assert!(matches!(
        catalog.manager.remove_tag("nocturne", ""),
        Err(CatalogError::EmptyTag)
    ));
    assert!(matches!(
        catalog.manager.remove_tag("nocturne", "Baroque"),
        Err(CatalogError::TagNotFound(tag)) if tag == "Baroque"
    ));
    assert!(catalog
        .manager
        .append_tag("ghost", "Piano")
        .unwrap_err()
        .is_not_found());
}

#[test]
fn test_remove_then_append_restores_membership() {
    let catalog = TestCatalog::new();
    upload_with_tags(&catalog, "Nocturne", "Piano;Romantic");

    catalog.manager.remove_tag("nocturne", "Piano").unwrap();
    let sheet = catalog.manager.append_tag("nocturne", "Piano").unwrap();
    assert!(sheet.tag_set().unwrap().contains("Piano"));
}

#[test]
fn test_search_by_tag_is_exact_and_skips_corrupted_rows() {
    let catalog = TestCatalog::new();
    upload_with_tags(&catalog, "Nocturne", "Piano;Romantic");
    upload_with_tags(&catalog, "Ballade", "Pianoforte");
    upload_with_tags(&catalog, "Mazurka", "Piano");

    let mut broken = catalog.manager.find_by_safe_name("mazurka").unwrap();
    broken.tags = "{Piano".to_string();
    catalog.store.update_sheet(&broken).unwrap();

    let found = catalog.manager.search_by_tag(" Piano ").unwrap();
    let names: Vec<_> = found.iter().map(|s| s.safe_sheet_name.as_str()).collect();
    assert_eq!(names, vec!["nocturne"]);

    assert!(matches!(
        catalog.manager.search_by_tag(""),
        Err(CatalogError::EmptyTag)
    ));
}

#[test]
fn test_update_information_text() {
    let catalog = TestCatalog::new();
    upload_with_tags(&catalog, "Nocturne", "");
    let before = catalog.manager.find_by_safe_name("nocturne").unwrap();

    let sheet = catalog
        .manager
        .update_information_text("nocturne", "Dedicated to Marie Pleyel")
        .unwrap();
    assert_eq!(sheet.information_text, "Dedicated to Marie Pleyel");
    assert!(sheet.updated_at >= before.updated_at);

    let stored = catalog.manager.find_by_safe_name("nocturne").unwrap();
    assert_eq!(stored.information_text, "Dedicated to Marie Pleyel");
    assert_eq!(stored.safe_sheet_name, before.safe_sheet_name);
    assert_eq!(stored.pdf_url, before.pdf_url);
}
