//! Shared test fixtures - the orders/billing schema used across tests
//!
//! One customer with two orders; order 7 carries two items (positions 2
//! and 1, deliberately seeded out of order) and an invoice, order 8
//! carries one item and a shipment.

use std::sync::Arc;

use crate::annotation::{keys, AnnotationSet, AnnotationValue, ClassAnnotations};
use crate::schema::{EntityDef, ForeignLink, Schema};
use crate::service::ServiceInstance;
use crate::storage::{MemoryBackend, OrderDirection, Row};
use crate::value::FieldValue;

pub fn row(pairs: &[(&str, FieldValue)]) -> Row {
    pairs
        .iter()
        .map(|(column, value)| (column.to_string(), value.clone()))
        .collect()
}

fn map(entries: &[(&str, AnnotationValue)]) -> AnnotationValue {
    AnnotationValue::Map(
        entries
            .iter()
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect(),
    )
}

pub fn schema() -> Arc<Schema> {
    let schema = Schema::new();

    schema
        .register_entity(
            EntityDef::new("Customer", "customers")
                .with_columns(&["id", "name"])
                .with_reference("Order", ForeignLink::new("id", "customer_id")),
        )
        .unwrap();
    schema
        .register_entity(
            EntityDef::new("Order", "orders")
                .with_columns(&["id", "number", "customer_id"])
                .with_sort_columns(vec![("id".to_string(), OrderDirection::Asc)]),
        )
        .unwrap();
    schema
        .register_entity(
            EntityDef::new("OrderItem", "order_items")
                .with_columns(&["id", "order_id", "sku", "position", "quantity"])
                .with_sort_columns(vec![("id".to_string(), OrderDirection::Asc)])
                .with_reference("Order", ForeignLink::new("order_id", "id")),
        )
        .unwrap();
    schema
        .register_entity(
            EntityDef::new("Shipment", "shipments")
                .with_columns(&["id", "order_id", "carrier"])
                .with_reference("Order", ForeignLink::new("order_id", "id")),
        )
        .unwrap();
    schema
        .register_entity(
            EntityDef::new("Invoice", "invoices")
                .with_columns(&["id", "order_id", "total"])
                .with_reference("Order", ForeignLink::new("order_id", "id")),
        )
        .unwrap();

    schema
        .register_service(
            "BillingService",
            &ClassAnnotations::new().with_class(
                AnnotationSet::new()
                    .with(keys::CONTAINS, AnnotationValue::ty("Invoice"))
                    .with(keys::REVEAL_AS, "invoice"),
            ),
        )
        .unwrap();

    let order_service = ClassAnnotations::new()
        .with_class(
            AnnotationSet::new()
                .with(keys::CONTAINS, AnnotationValue::ty("Order"))
                .with(keys::REVEAL_AS, "order"),
        )
        .with_property(
            "customer",
            AnnotationSet::new()
                .with(keys::CONTAINS, AnnotationValue::ty("Customer"))
                .with(keys::REVEAL_AS, "customer")
                .with(keys::ON_CONSTRUCT, true),
        )
        .with_property(
            "items",
            AnnotationSet::new()
                .with(keys::COLLECTION, AnnotationValue::ty("OrderItem"))
                .with(keys::REVEAL_AS, "items")
                .with(keys::SINGULAR, "item")
                .with(
                    keys::SORT,
                    AnnotationValue::List(vec![AnnotationValue::List(vec![
                        "position".into(),
                        "asc".into(),
                    ])]),
                )
                .with(keys::HAS, map(&[("match", "sku".into())]))
                .with(keys::ADD, map(&[("property", "sku".into())]))
                .with(keys::REMOVE, map(&[("property", "sku".into())]))
                .with(keys::LAZY, true),
        )
        .with_property(
            "shipment",
            AnnotationSet::new()
                .with(keys::CONTAINS, AnnotationValue::ty("Shipment"))
                .with(keys::REVEAL_AS, "shipment")
                .with(keys::CREATE_INSTANCE, true)
                .with(keys::PASS_THROUGH, true)
                .with(keys::LAZY, true),
        )
        .with_property(
            "billing",
            AnnotationSet::new()
                .with(keys::SERVICE, AnnotationValue::ty("BillingService"))
                .with(keys::REVEAL_AS, "billing")
                .with(keys::LAZY, true),
        )
        .with_property(
            "carrier",
            AnnotationSet::new()
                .with(
                    keys::COLUMN,
                    map(&[
                        ("repository", AnnotationValue::ty("Shipment")),
                        ("column", "carrier".into()),
                        ("isChild", AnnotationValue::from(true)),
                    ]),
                )
                .with(keys::REVEAL_AS, "carrier")
                .with(keys::INSTANCE_OF, "value")
                .with(keys::LAZY, true),
        )
        .with_property(
            "entries",
            AnnotationSet::new()
                .with(keys::COLLECTION, AnnotationValue::ty("OrderItem"))
                .with(keys::SINGULAR, "entry")
                .with(keys::LAZY, true),
        );
    schema.register_service("OrderService", &order_service).unwrap();

    Arc::new(schema)
}

pub fn backend() -> Arc<MemoryBackend> {
    let backend = MemoryBackend::new();
    backend.seed(
        "customers",
        vec![row(&[
            ("id", FieldValue::Int(1)),
            ("name", FieldValue::from("Ada")),
        ])],
    );
    backend.seed(
        "orders",
        vec![
            row(&[
                ("id", FieldValue::Int(7)),
                ("number", FieldValue::from("A-7")),
                ("customer_id", FieldValue::Int(1)),
            ]),
            row(&[
                ("id", FieldValue::Int(8)),
                ("number", FieldValue::from("A-8")),
                ("customer_id", FieldValue::Int(1)),
            ]),
        ],
    );
    backend.seed(
        "order_items",
        vec![
            row(&[
                ("id", FieldValue::Int(1)),
                ("order_id", FieldValue::Int(7)),
                ("sku", FieldValue::from("SKU-B")),
                ("position", FieldValue::Int(2)),
                ("quantity", FieldValue::Int(1)),
            ]),
            row(&[
                ("id", FieldValue::Int(2)),
                ("order_id", FieldValue::Int(7)),
                ("sku", FieldValue::from("SKU-A")),
                ("position", FieldValue::Int(1)),
                ("quantity", FieldValue::Int(3)),
            ]),
            row(&[
                ("id", FieldValue::Int(3)),
                ("order_id", FieldValue::Int(8)),
                ("sku", FieldValue::from("SKU-C")),
                ("position", FieldValue::Int(1)),
                ("quantity", FieldValue::Int(2)),
            ]),
        ],
    );
    backend.seed(
        "shipments",
        vec![row(&[
            ("id", FieldValue::Int(1)),
            ("order_id", FieldValue::Int(8)),
            ("carrier", FieldValue::from("DHL")),
        ])],
    );
    backend.seed(
        "invoices",
        vec![row(&[
            ("id", FieldValue::Int(1)),
            ("order_id", FieldValue::Int(7)),
            ("total", FieldValue::Int(42)),
        ])],
    );
    Arc::new(backend)
}

pub fn order_service(
    schema: &Arc<Schema>,
    backend: &Arc<MemoryBackend>,
    id: i64,
) -> ServiceInstance {
    ServiceInstance::find(schema.clone(), backend.clone(), "OrderService", id).unwrap()
}
