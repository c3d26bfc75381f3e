//! Back-office product management against the fake backend.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use secrecy::SecretString;
use threadline_admin::{AdminError, AdminFilter, AdminProducts, ProductDraft};
use threadline_client::{MemoryCredentialStore, SessionEvents};
use threadline_core::{ProductId, ProductStatus};
use threadline_integration_tests::{ADMIN_EMAIL, PASSWORD, TestBackend};

/// Sign in through the storefront and share the session with the admin client.
async fn admin_as(backend: &TestBackend, email: &str) -> AdminProducts {
    let store = Arc::new(MemoryCredentialStore::new());
    backend
        .storefront(store.clone(), SessionEvents::default())
        .account()
        .login(email, &SecretString::from(PASSWORD))
        .await
        .unwrap();
    backend.admin(store)
}

fn kurta() -> ProductDraft {
    ProductDraft {
        name: "Block Print Kurta".to_string(),
        description: "Hand block printed cotton".to_string(),
        category: "kurtas".to_string(),
        price: "1899".parse().unwrap(),
        discounted_price: Some("1499".parse().unwrap()),
        stock: 7,
        sizes: vec!["M".to_string(), "L".to_string()],
        colors: vec!["indigo".to_string()],
        ..ProductDraft::default()
    }
}

#[tokio::test]
async fn test_list_filters_by_status() {
    let backend = TestBackend::start().await;
    let admin = admin_as(&backend, ADMIN_EMAIL).await;

    let all = admin.list(&AdminFilter::default()).await.unwrap();
    assert_eq!(all.len(), 5);
    assert_eq!(all[0].id.as_str(), "p5");

    let inactive = admin
        .list(&AdminFilter {
            status: Some(ProductStatus::Inactive),
            ..AdminFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(inactive.len(), 1);
    assert_eq!(inactive[0].name, "Archived Scarf");
}

#[tokio::test]
async fn test_create_toggle_delete() {
    let backend = TestBackend::start().await;
    let admin = admin_as(&backend, ADMIN_EMAIL).await;

    let created = admin.create(&kurta()).await.unwrap();
    assert_eq!(created.id.as_str(), "p6");
    assert_eq!(created.effective_price(), "1499".parse().unwrap());
    assert_eq!(created.status, ProductStatus::Active);

    let status = admin
        .toggle_status(&created.id, created.status)
        .await
        .unwrap();
    assert_eq!(status, ProductStatus::Inactive);
    assert_eq!(backend.state.product("p6").unwrap()["status"], "inactive");

    let mut draft = ProductDraft::from(&admin.get(&created.id).await.unwrap());
    draft.stock = 3;
    let updated = admin.update(&created.id, &draft).await.unwrap();
    assert_eq!(updated.stock, 3);
    assert_eq!(updated.status, ProductStatus::Inactive);

    admin.delete(&created.id).await.unwrap();
    assert!(backend.state.product("p6").is_none());
    assert!(matches!(
        admin.delete(&created.id).await,
        Err(AdminError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_invalid_draft_never_reaches_backend() {
    let backend = TestBackend::start().await;
    let admin = admin_as(&backend, ADMIN_EMAIL).await;

    let draft = ProductDraft {
        discounted_price: Some("2500".parse().unwrap()),
        ..kurta()
    };
    let err = admin.create(&draft).await.unwrap_err();

    assert!(matches!(err, AdminError::Invalid(ref errors) if errors[0].field == "discountedPrice"));
    assert!(backend.state.requests_to("/admin/products").is_empty());
}

#[tokio::test]
async fn test_shopper_is_forbidden() {
    let backend = TestBackend::start().await;
    let admin = admin_as(&backend, "shopper@threadline.test").await;

    let err = admin.list(&AdminFilter::default()).await.unwrap_err();
    assert!(matches!(err, AdminError::Forbidden));

    let err = admin
        .toggle_status(&ProductId::new("p1"), ProductStatus::Active)
        .await
        .unwrap_err();
    assert!(matches!(err, AdminError::Forbidden));
    assert_eq!(backend.state.product("p1").unwrap()["status"], "active");
}
