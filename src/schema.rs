//! Resource schema registry
//!
//! Each resource type is described by a static [`ResourceSchema`]: its key
//! attribute, the fields a record carries, and any extra mutation guard. The
//! generic CRUD service is driven entirely by these descriptions.

use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::record::Record;

/// The resource types served by this crate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Customer,
    Admin,
    Link,
    Order,
    OrderDetail,
    Review,
    Product,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 7] = [
        ResourceKind::Customer,
        ResourceKind::Admin,
        ResourceKind::Link,
        ResourceKind::Order,
        ResourceKind::OrderDetail,
        ResourceKind::Review,
        ResourceKind::Product,
    ];

    /// URL path segment for this resource
    pub fn slug(self) -> &'static str {
        match self {
            ResourceKind::Customer => "customers",
            ResourceKind::Admin => "admins",
            ResourceKind::Link => "links",
            ResourceKind::Order => "orders",
            ResourceKind::OrderDetail => "order-details",
            ResourceKind::Review => "reviews",
            ResourceKind::Product => "products",
        }
    }

    pub fn schema(self) -> &'static ResourceSchema {
        match self {
            ResourceKind::Customer => &CUSTOMER,
            ResourceKind::Admin => &ADMIN,
            ResourceKind::Link => &LINK,
            ResourceKind::Order => &ORDER,
            ResourceKind::OrderDetail => &ORDER_DETAIL,
            ResourceKind::Review => &REVIEW,
            ResourceKind::Product => &PRODUCT,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceKind::ALL
            .into_iter()
            .find(|kind| kind.slug() == s)
            .ok_or_else(|| format!("Unknown resource: {}", s))
    }
}

/// Presence/type rule for a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Non-empty string
    Text,
    /// Any JSON number
    Number,
    /// Exactly `true` or `false`
    Boolean,
    /// Any non-null JSON value (string, number, list, object, ...)
    Value,
}

impl FieldKind {
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            FieldKind::Text => value.as_str().map_or(false, |s| !s.is_empty()),
            FieldKind::Number => value.is_number(),
            FieldKind::Boolean => value.is_boolean(),
            FieldKind::Value => !value.is_null(),
        }
    }

    fn describe(self) -> &'static str {
        match self {
            FieldKind::Text => "a non-empty string",
            FieldKind::Number => "a number",
            FieldKind::Boolean => "a boolean",
            FieldKind::Value => "present",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
}

const fn field(name: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec { name, kind }
}

/// Extra check run against the stored record before update/delete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationGuard {
    None,
    /// Records whose `is_default_owner` flag is `true` are immutable
    DefaultOwner,
}

/// Stored attribute marking the protected administrator
pub const DEFAULT_OWNER_FLAG: &str = "is_default_owner";

impl MutationGuard {
    /// Whether the guard forbids mutating `record`
    pub fn forbids(self, record: &Record) -> bool {
        match self {
            MutationGuard::None => false,
            MutationGuard::DefaultOwner => record
                .get(DEFAULT_OWNER_FLAG)
                .and_then(Value::as_bool)
                .unwrap_or(false),
        }
    }
}

#[derive(Debug)]
pub struct ResourceSchema {
    pub kind: ResourceKind,
    /// Table name used when configuration does not override it
    pub default_table: &'static str,
    /// Environment variable overriding the table name
    pub table_env: &'static str,
    pub key_field: &'static str,
    pub fields: &'static [FieldSpec],
    pub guard: MutationGuard,
    /// Field holding the URL of an associated image object
    pub image_field: Option<&'static str>,
}

/// Why a body failed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    pub field: &'static str,
    pub expected: &'static str,
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "field '{}' must be {}", self.field, self.expected)
    }
}

impl ResourceSchema {
    /// Check every declared field of `body`, reporting the first violation
    pub fn validate(&self, body: &Record) -> Result<(), FieldViolation> {
        for spec in self.fields {
            let ok = body.get(spec.name).map_or(false, |v| spec.kind.accepts(v));
            if !ok {
                return Err(FieldViolation {
                    field: spec.name,
                    expected: spec.kind.describe(),
                });
            }
        }
        Ok(())
    }

    /// The declared fields of `body`; omitted ones become `null`
    pub fn project(&self, body: &Record) -> Record {
        self.fields
            .iter()
            .map(|spec| {
                let value = body.get(spec.name).cloned().unwrap_or(Value::Null);
                (spec.name.to_string(), value)
            })
            .collect()
    }
}

use FieldKind::{Boolean, Number, Text};

pub static CUSTOMER: ResourceSchema = ResourceSchema {
    kind: ResourceKind::Customer,
    default_table: "CustomerTable",
    table_env: "CUSTOMERS_TABLE",
    key_field: "idCustomer",
    fields: &[field("cedula", Text), field("name", Text), field("address", Text)],
    guard: MutationGuard::None,
    image_field: None,
};

pub static ADMIN: ResourceSchema = ResourceSchema {
    kind: ResourceKind::Admin,
    default_table: "AdminsTable",
    table_env: "ADMINS_TABLE",
    key_field: "id",
    fields: &[
        field("first_name", Text),
        field("last_name", Text),
        field("email", Text),
        field("password", Text),
    ],
    guard: MutationGuard::DefaultOwner,
    image_field: None,
};

pub static LINK: ResourceSchema = ResourceSchema {
    kind: ResourceKind::Link,
    default_table: "LinksTable",
    table_env: "LINKS_TABLE",
    key_field: "id",
    fields: &[
        field("name", Text),
        field("description", Text),
        field("content", Text),
        field("available", Boolean),
    ],
    guard: MutationGuard::None,
    image_field: None,
};

pub static ORDER: ResourceSchema = ResourceSchema {
    kind: ResourceKind::Order,
    default_table: "OrdersTable",
    table_env: "ORDERS_TABLE",
    key_field: "id",
    fields: &[
        field("user_id", Text),
        field("order_date", Text),
        field("status", Text),
        field("total", Number),
        field("shipping_address", FieldKind::Value),
        field("payment_method", Text),
    ],
    guard: MutationGuard::None,
    image_field: None,
};

pub static ORDER_DETAIL: ResourceSchema = ResourceSchema {
    kind: ResourceKind::OrderDetail,
    default_table: "OrderDetailsTable",
    table_env: "ORDER_DETAILS_TABLE",
    key_field: "id",
    fields: &[
        field("order_id", Text),
        field("product_id", Text),
        field("quantity", Number),
        field("unit_price", Number),
        field("discount", Number),
    ],
    guard: MutationGuard::None,
    image_field: None,
};

pub static REVIEW: ResourceSchema = ResourceSchema {
    kind: ResourceKind::Review,
    default_table: "ReviewsTable",
    table_env: "REVIEWS_TABLE",
    key_field: "id",
    fields: &[
        field("product_id", Text),
        field("user_id", Text),
        field("comment", Text),
        field("rating", Number),
    ],
    guard: MutationGuard::None,
    image_field: None,
};

pub static PRODUCT: ResourceSchema = ResourceSchema {
    kind: ResourceKind::Product,
    default_table: "ProductsTable",
    table_env: "PRODUCTS_TABLE",
    key_field: "id",
    fields: &[
        field("name", Text),
        field("description", Text),
        field("price", Number),
        field("stock", Number),
        field("supplier_id", Text),
        field("image", Text),
        field("available", Boolean),
    ],
    guard: MutationGuard::None,
    image_field: Some("image"),
};
