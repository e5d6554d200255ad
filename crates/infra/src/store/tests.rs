//! Contract tests shared by every `CatalogStore` backend.

use chrono::{DateTime, Duration, TimeZone, Utc};

use stockroom_core::{MovementId, ProductId};
use stockroom_inventory::{Movement, MovementAction, RecordMovement, UpdateMovement};
use stockroom_products::{CreateProduct, Product, UpdateProduct};

use super::{
    CatalogStore, InMemoryCatalogStore, MovementChange, MovementFilter, ProductQuery,
    SqliteCatalogStore, StoreError,
};

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000, 0).unwrap() + Duration::seconds(secs)
}

fn product(code: &str, name: &str) -> Product {
    Product::create(CreateProduct::new(code, name, at(0))).unwrap()
}

fn movement(product_id: ProductId, action: MovementAction, quantity: i64, secs: i64) -> Movement {
    Movement::record(RecordMovement::new(product_id, action, quantity, at(secs))).unwrap()
}

/// Runs one contract check against each backend.
macro_rules! contract_tests {
    ($($name:ident),* $(,)?) => {
        mod in_memory {
            $(
                #[tokio::test]
                async fn $name() {
                    super::$name(super::InMemoryCatalogStore::new()).await;
                }
            )*
        }

        mod sqlite {
            $(
                #[tokio::test]
                async fn $name() {
                    let store = super::SqliteCatalogStore::in_memory().await.unwrap();
                    super::$name(store).await;
                }
            )*
        }
    };
}

contract_tests!(
    product_round_trips,
    duplicate_code_is_rejected,
    update_to_taken_code_is_rejected,
    missing_rows_are_not_found,
    movement_requires_existing_product,
    delete_product_cascades,
    products_listed_by_name,
    search_matches_name_or_code,
    movements_listed_newest_first,
    movement_filter_by_product_and_action,
    product_form_is_all_or_nothing,
    product_form_applies_every_change,
);

async fn product_round_trips<S: CatalogStore>(store: S) {
    let mut cmd = CreateProduct::new("SKU-1", "widget", at(0));
    cmd.description = Some("blue, 3mm".to_string());
    let p = Product::create(cmd).unwrap();
    store.insert_product(&p).await.unwrap();

    assert_eq!(store.get_product(p.id_typed()).await.unwrap(), Some(p.clone()));

    let edited = p
        .edit(&UpdateProduct {
            is_active: Some(false),
            ..UpdateProduct::touch(at(10))
        })
        .unwrap();
    store.update_product(&edited).await.unwrap();
    assert_eq!(store.get_product(p.id_typed()).await.unwrap(), Some(edited));
}

async fn duplicate_code_is_rejected<S: CatalogStore>(store: S) {
    let first = product("SKU-1", "widget");
    store.insert_product(&first).await.unwrap();

    let err = store
        .insert_product(&product("SKU-1", "gadget"))
        .await
        .unwrap_err();
    assert!(
        matches!(&err, StoreError::UniqueViolation { field, .. } if field == "code"),
        "{err:?}"
    );

    let all = store.list_products(&ProductQuery::default()).await.unwrap();
    assert_eq!(all, vec![first]);
}

async fn update_to_taken_code_is_rejected<S: CatalogStore>(store: S) {
    let a = product("A", "anchor");
    let b = product("B", "bolt");
    store.insert_product(&a).await.unwrap();
    store.insert_product(&b).await.unwrap();

    let clash = b
        .edit(&UpdateProduct {
            code: Some("A".to_string()),
            ..UpdateProduct::touch(at(5))
        })
        .unwrap();
    let err = store.update_product(&clash).await.unwrap_err();
    assert!(matches!(err, StoreError::UniqueViolation { .. }), "{err:?}");
    assert_eq!(store.get_product(b.id_typed()).await.unwrap(), Some(b));
}

async fn missing_rows_are_not_found<S: CatalogStore>(store: S) {
    assert_eq!(store.get_product(ProductId::new()).await.unwrap(), None);
    assert_eq!(store.get_movement(MovementId::new()).await.unwrap(), None);

    assert_eq!(
        store.update_product(&product("X", "ghost")).await,
        Err(StoreError::NotFound)
    );
    assert_eq!(store.delete_product(ProductId::new()).await, Err(StoreError::NotFound));
    assert_eq!(store.delete_movement(MovementId::new()).await, Err(StoreError::NotFound));
}

async fn movement_requires_existing_product<S: CatalogStore>(store: S) {
    let orphan = movement(ProductId::new(), MovementAction::Deposit, 1, 0);
    let err = store.insert_movement(&orphan).await.unwrap_err();
    assert!(matches!(err, StoreError::ForeignKeyViolation(_)), "{err:?}");
    assert_eq!(store.get_movement(orphan.id_typed()).await.unwrap(), None);
}

async fn delete_product_cascades<S: CatalogStore>(store: S) {
    let p = product("SKU-1", "widget");
    let other = product("SKU-2", "gadget");
    store.insert_product(&p).await.unwrap();
    store.insert_product(&other).await.unwrap();

    let m1 = movement(p.id_typed(), MovementAction::Deposit, 5, 1);
    let m2 = movement(p.id_typed(), MovementAction::Withdrawal, 2, 2);
    let kept = movement(other.id_typed(), MovementAction::Deposit, 7, 3);
    for m in [&m1, &m2, &kept] {
        store.insert_movement(m).await.unwrap();
    }

    store.delete_product(p.id_typed()).await.unwrap();

    assert_eq!(store.get_movement(m1.id_typed()).await.unwrap(), None);
    assert_eq!(store.get_movement(m2.id_typed()).await.unwrap(), None);
    let left = store.list_movements(&MovementFilter::default()).await.unwrap();
    assert_eq!(left, vec![kept]);
}

async fn products_listed_by_name<S: CatalogStore>(store: S) {
    for (code, name) in [("3", "washer"), ("1", "bolt"), ("2", "anchor")] {
        store.insert_product(&product(code, name)).await.unwrap();
    }

    let names: Vec<String> = store
        .list_products(&ProductQuery::default())
        .await
        .unwrap()
        .iter()
        .map(|p| p.name().to_string())
        .collect();
    assert_eq!(names, vec!["ANCHOR", "BOLT", "WASHER"]);
}

async fn search_matches_name_or_code<S: CatalogStore>(store: S) {
    store.insert_product(&product("HX-10", "hex bolt")).await.unwrap();
    store.insert_product(&product("WS-4", "washer")).await.unwrap();
    store.insert_product(&product("NT-2", "nut")).await.unwrap();

    let by_name = store.list_products(&ProductQuery::search("bolt")).await.unwrap();
    assert_eq!(by_name.len(), 1);
    assert_eq!(by_name[0].code(), "HX-10");

    let by_code = store.list_products(&ProductQuery::search("ws-")).await.unwrap();
    assert_eq!(by_code.len(), 1);
    assert_eq!(by_code[0].name(), "WASHER");

    let blank = store.list_products(&ProductQuery::search("   ")).await.unwrap();
    assert_eq!(blank.len(), 3);

    // Non-ASCII letters fold like ASCII ones on every backend.
    store.insert_product(&product("Più-1", "città")).await.unwrap();
    for term in ["città", "CITTÀ", "Città", "più", "PIÙ-1"] {
        let hits = store.list_products(&ProductQuery::search(term)).await.unwrap();
        assert_eq!(hits.len(), 1, "search {term:?}");
        assert_eq!(hits[0].name(), "CITTÀ");
    }
    let unaccented = store.list_products(&ProductQuery::search("citta")).await.unwrap();
    assert!(unaccented.is_empty());

    let none = store.list_products(&ProductQuery::search("gear")).await.unwrap();
    assert!(none.is_empty());
}

async fn movements_listed_newest_first<S: CatalogStore>(store: S) {
    let p = product("SKU-1", "widget");
    store.insert_product(&p).await.unwrap();

    let old = movement(p.id_typed(), MovementAction::Deposit, 1, 1);
    let mid = movement(p.id_typed(), MovementAction::Deposit, 2, 2);
    let new = movement(p.id_typed(), MovementAction::Deposit, 3, 3);
    for m in [&mid, &new, &old] {
        store.insert_movement(m).await.unwrap();
    }

    // Editing the oldest one makes it the most recently modified.
    let touched = old
        .edit(&UpdateMovement {
            quantity: Some(10),
            ..UpdateMovement::touch(at(4))
        })
        .unwrap();
    store.update_movement(&touched).await.unwrap();

    let ids: Vec<MovementId> = store
        .list_movements(&MovementFilter::for_product(p.id_typed()))
        .await
        .unwrap()
        .iter()
        .map(|m| m.id_typed())
        .collect();
    assert_eq!(ids, vec![old.id_typed(), new.id_typed(), mid.id_typed()]);
}

async fn movement_filter_by_product_and_action<S: CatalogStore>(store: S) {
    let a = product("A", "anchor");
    let b = product("B", "bolt");
    store.insert_product(&a).await.unwrap();
    store.insert_product(&b).await.unwrap();

    let a_in = movement(a.id_typed(), MovementAction::Deposit, 5, 1);
    let a_out = movement(a.id_typed(), MovementAction::Withdrawal, 1, 2);
    let b_out = movement(b.id_typed(), MovementAction::Withdrawal, 4, 3);
    for m in [&a_in, &a_out, &b_out] {
        store.insert_movement(m).await.unwrap();
    }

    let for_a = store
        .list_movements(&MovementFilter::for_product(a.id_typed()))
        .await
        .unwrap();
    assert_eq!(for_a, vec![a_out.clone(), a_in]);

    let withdrawals = store
        .list_movements(&MovementFilter::default().with_action(MovementAction::Withdrawal))
        .await
        .unwrap();
    assert_eq!(withdrawals, vec![b_out, a_out.clone()]);

    let both = store
        .list_movements(
            &MovementFilter::for_product(a.id_typed()).with_action(MovementAction::Withdrawal),
        )
        .await
        .unwrap();
    assert_eq!(both, vec![a_out]);
}

async fn product_form_is_all_or_nothing<S: CatalogStore>(store: S) {
    let p = product("SKU-1", "widget");
    store.insert_product(&p).await.unwrap();
    let existing = movement(p.id_typed(), MovementAction::Deposit, 5, 1);
    store.insert_movement(&existing).await.unwrap();

    let renamed = p
        .edit(&UpdateProduct {
            name: Some("gizmo".to_string()),
            ..UpdateProduct::touch(at(9))
        })
        .unwrap();
    let changes = vec![
        MovementChange::Delete(existing.id_typed()),
        MovementChange::Insert(movement(p.id_typed(), MovementAction::Deposit, 8, 9)),
        // Fails: the row does not exist.
        MovementChange::Delete(MovementId::new()),
    ];

    let err = store.save_product_form(&renamed, &changes).await.unwrap_err();
    assert_eq!(err, StoreError::NotFound);

    assert_eq!(store.get_product(p.id_typed()).await.unwrap(), Some(p.clone()));
    let left = store
        .list_movements(&MovementFilter::for_product(p.id_typed()))
        .await
        .unwrap();
    assert_eq!(left, vec![existing]);
}

async fn product_form_applies_every_change<S: CatalogStore>(store: S) {
    let p = product("SKU-1", "widget");
    store.insert_product(&p).await.unwrap();
    let changed = movement(p.id_typed(), MovementAction::Deposit, 5, 1);
    let removed = movement(p.id_typed(), MovementAction::Deposit, 6, 2);
    store.insert_movement(&changed).await.unwrap();
    store.insert_movement(&removed).await.unwrap();

    let renamed = p
        .edit(&UpdateProduct {
            name: Some("gizmo".to_string()),
            ..UpdateProduct::touch(at(9))
        })
        .unwrap();
    let updated = changed
        .edit(&UpdateMovement {
            action: Some("withdrawal".to_string()),
            ..UpdateMovement::touch(at(9))
        })
        .unwrap();
    let added = movement(p.id_typed(), MovementAction::Deposit, 20, 10);

    store
        .save_product_form(
            &renamed,
            &[
                MovementChange::Update(updated.clone()),
                MovementChange::Delete(removed.id_typed()),
                MovementChange::Insert(added.clone()),
            ],
        )
        .await
        .unwrap();

    assert_eq!(
        store.get_product(p.id_typed()).await.unwrap().map(|p| p.name().to_string()),
        Some("GIZMO".to_string())
    );
    let left = store
        .list_movements(&MovementFilter::for_product(p.id_typed()))
        .await
        .unwrap();
    assert_eq!(left, vec![added, updated]);
}
