//! Tool dispatch: lookup, validation, authorization, execution.
//!
//! The dispatcher is the single choke point between a model invocation
//! and domain state. It never lets an internal fault escape as a
//! transport-level fault: every outcome is a [`ToolResult`] envelope.

use crate::handlers;
use serde_json::Value as JsonValue;
use std::str::FromStr;
use std::sync::Arc;
use storefront_conversation::{ErrorKind, ToolName, ToolResult};
use storefront_domain::{
    BillStore, CredentialHasher, DomainError, ProductStore, Role, User, UserStore,
};

/// Minimum role required to invoke a tool.
#[must_use]
pub fn required_role(tool: ToolName) -> Role {
    match tool {
        ToolName::CreateBill
        | ToolName::CheckProductStock
        | ToolName::GetProductPrice
        | ToolName::ListAllProducts
        | ToolName::GetLowStockProducts => Role::User,
        ToolName::AddProduct
        | ToolName::UpdateProductStock
        | ToolName::GetDailySales
        | ToolName::GetProfitLossReport
        | ToolName::GetAllUsers => Role::Admin,
        ToolName::CreateUser | ToolName::DeleteUser => Role::SuperAdmin,
    }
}

fn authorization_error(tool: ToolName) -> String {
    match tool {
        ToolName::AddProduct => {
            "You don't have permission to add products. Admin access required.".to_string()
        }
        ToolName::UpdateProductStock => {
            "You don't have permission to update stock. Admin access required.".to_string()
        }
        ToolName::GetDailySales => {
            "You don't have permission to view sales reports. Admin access required.".to_string()
        }
        ToolName::GetProfitLossReport => {
            "You don't have permission to view profit/loss reports. Admin access required."
                .to_string()
        }
        ToolName::GetAllUsers => {
            "You don't have permission to view users. Admin access required.".to_string()
        }
        ToolName::CreateUser => {
            "You don't have permission to create users. Super Admin access required.".to_string()
        }
        ToolName::DeleteUser => {
            "You don't have permission to delete users. Super Admin access required.".to_string()
        }
        other => format!(
            "You don't have permission to use {other}. {} access required.",
            required_role(other)
        ),
    }
}

/// Validates an argument mapping against a tool's parameter schema.
///
/// Checks that required fields are present and non-null and that present
/// fields match their declared primitive type; array items with object
/// schemas are checked element by element. This is the authoritative
/// validation: handlers may assume a conforming shape.
fn validate_arguments(schema: &JsonValue, args: &JsonValue) -> Result<(), DomainError> {
    validate_object(schema, args, "")
}

fn validate_object(schema: &JsonValue, value: &JsonValue, path: &str) -> Result<(), DomainError> {
    let empty = serde_json::Map::new();
    let object = match value {
        JsonValue::Object(map) => map,
        JsonValue::Null => &empty,
        _ => {
            return Err(DomainError::validation(
                if path.is_empty() { "arguments" } else { path },
                "must be an object",
            ));
        }
    };

    if let Some(required) = schema.get("required").and_then(JsonValue::as_array) {
        for field in required.iter().filter_map(JsonValue::as_str) {
            let qualified = qualify(path, field);
            match object.get(field) {
                None | Some(JsonValue::Null) => {
                    return Err(DomainError::validation(qualified, "missing required field"));
                }
                Some(_) => {}
            }
        }
    }

    let Some(properties) = schema.get("properties").and_then(JsonValue::as_object) else {
        return Ok(());
    };
    for (field, field_schema) in properties {
        let Some(value) = object.get(field) else {
            continue;
        };
        if value.is_null() {
            continue;
        }
        validate_field(field_schema, value, &qualify(path, field))?;
    }
    Ok(())
}

fn validate_field(schema: &JsonValue, value: &JsonValue, path: &str) -> Result<(), DomainError> {
    match schema.get("type").and_then(JsonValue::as_str) {
        Some("string") if !value.is_string() => {
            Err(DomainError::validation(path, "must be a string"))
        }
        Some("integer") if value.as_i64().is_none() => {
            Err(DomainError::validation(path, "must be an integer"))
        }
        Some("number") if !value.is_number() => {
            Err(DomainError::validation(path, "must be a number"))
        }
        Some("boolean") if !value.is_boolean() => {
            Err(DomainError::validation(path, "must be a boolean"))
        }
        Some("array") => {
            let Some(items) = value.as_array() else {
                return Err(DomainError::validation(path, "must be an array"));
            };
            if let Some(item_schema) = schema.get("items") {
                for (index, item) in items.iter().enumerate() {
                    validate_object(item_schema, item, &format!("{path}[{index}]"))?;
                }
            }
            Ok(())
        }
        Some("object") => validate_object(schema, value, path),
        _ => Ok(()),
    }
}

fn qualify(path: &str, field: &str) -> String {
    if path.is_empty() {
        field.to_string()
    } else {
        format!("{path}.{field}")
    }
}

fn failure_from(error: DomainError) -> ToolResult {
    let kind = match &error {
        DomainError::Validation { .. } | DomainError::SelfDeletion => ErrorKind::Validation,
        DomainError::NotFound { .. } | DomainError::AmbiguousProduct { .. } => ErrorKind::NotFound,
        DomainError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
        DomainError::Duplicate { .. } => ErrorKind::Duplicate,
        DomainError::Storage { .. } => ErrorKind::Internal,
    };
    ToolResult::failure(kind, error.to_string())
}

/// Authorizes and executes tool invocations against domain state.
pub struct Dispatcher {
    pub(crate) products: Arc<dyn ProductStore>,
    pub(crate) bills: Arc<dyn BillStore>,
    pub(crate) users: Arc<dyn UserStore>,
    pub(crate) hasher: Arc<dyn CredentialHasher>,
}

impl Dispatcher {
    /// Creates a dispatcher over the given stores.
    #[must_use]
    pub fn new(
        products: Arc<dyn ProductStore>,
        bills: Arc<dyn BillStore>,
        users: Arc<dyn UserStore>,
        hasher: Arc<dyn CredentialHasher>,
    ) -> Self {
        Self {
            products,
            bills,
            users,
            hasher,
        }
    }

    /// Executes one invocation: lookup, schema validation, authorization,
    /// handler. Every failure mode folds into the result envelope.
    pub async fn execute(&self, name: &str, arguments: &JsonValue, actor: &User) -> ToolResult {
        let tool = match ToolName::from_str(name) {
            Ok(tool) => tool,
            Err(e) => {
                tracing::warn!(tool = name, "model requested unknown tool");
                return ToolResult::failure(ErrorKind::UnknownTool, e.to_string());
            }
        };

        // Providers occasionally send null instead of an empty object.
        let normalized;
        let arguments = if arguments.is_null() {
            normalized = JsonValue::Object(serde_json::Map::new());
            &normalized
        } else {
            arguments
        };

        let definition = tool.definition();
        if let Err(e) = validate_arguments(&definition.parameters, arguments) {
            return failure_from(e);
        }

        let minimum = required_role(tool);
        if !actor.role.meets(minimum) {
            tracing::info!(
                tool = %tool,
                actor = %actor.username,
                role = %actor.role,
                "tool invocation denied"
            );
            return ToolResult::failure(ErrorKind::Authorization, authorization_error(tool));
        }

        let outcome = match tool {
            ToolName::CreateBill => handlers::create_bill(self, arguments, actor).await,
            ToolName::CheckProductStock => handlers::check_product_stock(self, arguments).await,
            ToolName::GetProductPrice => handlers::get_product_price(self, arguments).await,
            ToolName::ListAllProducts => handlers::list_all_products(self).await,
            ToolName::AddProduct => handlers::add_product(self, arguments).await,
            ToolName::UpdateProductStock => {
                handlers::update_product_stock(self, arguments).await
            }
            ToolName::GetDailySales => handlers::get_daily_sales(self, arguments).await,
            ToolName::GetLowStockProducts => {
                handlers::get_low_stock_products(self, arguments).await
            }
            ToolName::GetProfitLossReport => {
                handlers::get_profit_loss_report(self, arguments).await
            }
            ToolName::GetAllUsers => handlers::get_all_users(self).await,
            ToolName::CreateUser => handlers::create_user(self, arguments).await,
            ToolName::DeleteUser => handlers::delete_user(self, arguments, actor).await,
        };

        match outcome {
            Ok(result) => result,
            Err(e) => {
                if matches!(e, DomainError::Storage { .. }) {
                    tracing::error!(tool = %tool, error = %e, "tool execution failed");
                }
                failure_from(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use storefront_domain::{MemoryStore, NewProduct, NewUser};

    struct PlainHasher;

    impl CredentialHasher for PlainHasher {
        fn hash(&self, password: &str) -> Result<String, DomainError> {
            Ok(format!("hashed:{password}"))
        }

        fn verify(&self, password: &str, hash: &str) -> Result<bool, DomainError> {
            Ok(hash == format!("hashed:{password}"))
        }
    }

    struct Fixture {
        store: MemoryStore,
        dispatcher: Dispatcher,
    }

    fn fixture() -> Fixture {
        let store = MemoryStore::new();
        let shared = Arc::new(store.clone());
        let dispatcher = Dispatcher::new(
            shared.clone(),
            shared.clone(),
            shared,
            Arc::new(PlainHasher),
        );
        Fixture { store, dispatcher }
    }

    fn seed_widget(store: &MemoryStore, quantity: i32) {
        store.seed_product(NewProduct {
            name: "Widget".to_string(),
            quantity,
            purchase_price: 6.0,
            selling_price: 10.0,
            category: None,
            supplier: None,
        });
    }

    fn seed_user(store: &MemoryStore, username: &str, role: Role) -> User {
        store.seed_user(NewUser {
            username: username.to_string(),
            password_hash: "hash".to_string(),
            full_name: format!("{username} Person"),
            email: format!("{username}@example.com"),
            role,
        })
    }

    #[tokio::test]
    async fn unknown_tool_is_rejected() {
        let fx = fixture();
        let actor = seed_user(&fx.store, "root", Role::SuperAdmin);
        let result = fx.dispatcher.execute("drop_database", &json!({}), &actor).await;
        assert!(!result.success);
        assert_eq!(result.error_kind, Some(ErrorKind::UnknownTool));
        assert!(result.user_text().contains("drop_database"));
    }

    #[tokio::test]
    async fn missing_required_field_is_validation_error() {
        let fx = fixture();
        let actor = seed_user(&fx.store, "alice", Role::User);
        let result = fx
            .dispatcher
            .execute("check_product_stock", &json!({}), &actor)
            .await;
        assert_eq!(result.error_kind, Some(ErrorKind::Validation));
        assert!(result.user_text().contains("product_name"));
    }

    #[tokio::test]
    async fn wrong_argument_type_is_validation_error() {
        let fx = fixture();
        let actor = seed_user(&fx.store, "alice", Role::User);
        let result = fx
            .dispatcher
            .execute(
                "check_product_stock",
                &json!({"product_name": 42}),
                &actor,
            )
            .await;
        assert_eq!(result.error_kind, Some(ErrorKind::Validation));
        assert!(result.user_text().contains("must be a string"));
    }

    #[tokio::test]
    async fn nested_bill_items_are_schema_checked() {
        let fx = fixture();
        let actor = seed_user(&fx.store, "alice", Role::User);
        let result = fx
            .dispatcher
            .execute(
                "create_bill",
                &json!({"items": [{"product_name": "Widget"}]}),
                &actor,
            )
            .await;
        assert_eq!(result.error_kind, Some(ErrorKind::Validation));
        assert!(result.user_text().contains("items[0].quantity"));
    }

    #[tokio::test]
    async fn user_role_is_denied_admin_tools() {
        let fx = fixture();
        let actor = seed_user(&fx.store, "alice", Role::User);

        for (tool, args) in [
            ("add_product", json!({"name": "X", "quantity": 1, "purchase_price": 1.0, "selling_price": 2.0})),
            ("update_product_stock", json!({"product_name": "X", "new_quantity": 1})),
            ("get_daily_sales", json!({})),
            ("get_profit_loss_report", json!({})),
            ("get_all_users", json!({})),
        ] {
            let result = fx.dispatcher.execute(tool, &args, &actor).await;
            assert_eq!(
                result.error_kind,
                Some(ErrorKind::Authorization),
                "tool {tool} should be denied"
            );
            assert!(result.user_text().contains("Admin access required"));
        }
    }

    #[tokio::test]
    async fn admin_role_is_denied_user_management() {
        let fx = fixture();
        let actor = seed_user(&fx.store, "bob", Role::Admin);

        let result = fx
            .dispatcher
            .execute(
                "create_user",
                &json!({
                    "username": "new",
                    "password": "pw",
                    "full_name": "New",
                    "email": "new@example.com",
                    "role": "user"
                }),
                &actor,
            )
            .await;
        assert_eq!(result.error_kind, Some(ErrorKind::Authorization));
        assert!(result.user_text().contains("Super Admin access required"));

        let result = fx
            .dispatcher
            .execute("delete_user", &json!({"username": "x"}), &actor)
            .await;
        assert_eq!(result.error_kind, Some(ErrorKind::Authorization));
    }

    #[tokio::test]
    async fn admin_can_run_inventory_and_reports() {
        let fx = fixture();
        let actor = seed_user(&fx.store, "bob", Role::Admin);

        let result = fx
            .dispatcher
            .execute(
                "add_product",
                &json!({"name": "Widget", "quantity": 4, "purchase_price": 6.0, "selling_price": 10.0}),
                &actor,
            )
            .await;
        assert!(result.success, "unexpected failure: {:?}", result.error);

        let result = fx.dispatcher.execute("get_daily_sales", &json!({}), &actor).await;
        assert!(result.success);
    }

    #[tokio::test]
    async fn create_bill_decrements_stock_and_reports_total() {
        let fx = fixture();
        seed_widget(&fx.store, 5);
        let actor = seed_user(&fx.store, "alice", Role::User);

        let result = fx
            .dispatcher
            .execute(
                "create_bill",
                &json!({"items": [{"product_name": "Widget", "quantity": 3}]}),
                &actor,
            )
            .await;

        assert!(result.success, "unexpected failure: {:?}", result.error);
        assert_eq!(result.data["total_amount"], json!(30.0));
        assert!(
            result
                .data["bill_number"]
                .as_str()
                .expect("bill number")
                .starts_with("BILL")
        );
        assert!(result.user_text().contains("created successfully"));

        let check = fx
            .dispatcher
            .execute(
                "check_product_stock",
                &json!({"product_name": "widget"}),
                &actor,
            )
            .await;
        assert_eq!(check.data["quantity"], json!(2));
    }

    #[tokio::test]
    async fn create_bill_insufficient_stock_leaves_state_alone() {
        let fx = fixture();
        seed_widget(&fx.store, 2);
        let actor = seed_user(&fx.store, "alice", Role::User);

        let result = fx
            .dispatcher
            .execute(
                "create_bill",
                &json!({"items": [{"product_name": "Widget", "quantity": 6}]}),
                &actor,
            )
            .await;

        assert_eq!(result.error_kind, Some(ErrorKind::InsufficientStock));
        assert!(result.user_text().contains("Available: 2"));

        let check = fx
            .dispatcher
            .execute(
                "check_product_stock",
                &json!({"product_name": "Widget"}),
                &actor,
            )
            .await;
        assert_eq!(check.data["quantity"], json!(2));
    }

    #[tokio::test]
    async fn create_bill_unknown_product_is_not_found() {
        let fx = fixture();
        let actor = seed_user(&fx.store, "alice", Role::User);
        let result = fx
            .dispatcher
            .execute(
                "create_bill",
                &json!({"items": [{"product_name": "Sprocket", "quantity": 1}]}),
                &actor,
            )
            .await;
        assert_eq!(result.error_kind, Some(ErrorKind::NotFound));
        assert!(result.user_text().contains("Sprocket"));
    }

    #[tokio::test]
    async fn ambiguous_product_name_is_rejected() {
        let fx = fixture();
        fx.store.seed_product(NewProduct {
            name: "Cola Can".to_string(),
            quantity: 5,
            purchase_price: 0.5,
            selling_price: 1.0,
            category: None,
            supplier: None,
        });
        fx.store.seed_product(NewProduct {
            name: "Cola Bottle".to_string(),
            quantity: 5,
            purchase_price: 0.8,
            selling_price: 1.5,
            category: None,
            supplier: None,
        });
        let actor = seed_user(&fx.store, "alice", Role::User);

        let result = fx
            .dispatcher
            .execute("get_product_price", &json!({"product_name": "cola"}), &actor)
            .await;
        assert_eq!(result.error_kind, Some(ErrorKind::NotFound));
        assert!(result.user_text().contains("ambiguous"));
    }

    #[tokio::test]
    async fn add_product_rejects_duplicate_name() {
        let fx = fixture();
        seed_widget(&fx.store, 5);
        let actor = seed_user(&fx.store, "bob", Role::Admin);

        let result = fx
            .dispatcher
            .execute(
                "add_product",
                &json!({"name": "WIDGET", "quantity": 1, "purchase_price": 1.0, "selling_price": 2.0}),
                &actor,
            )
            .await;
        assert_eq!(result.error_kind, Some(ErrorKind::Duplicate));
    }

    #[tokio::test]
    async fn update_product_stock_replaces_quantity() {
        let fx = fixture();
        seed_widget(&fx.store, 5);
        let actor = seed_user(&fx.store, "bob", Role::Admin);

        let result = fx
            .dispatcher
            .execute(
                "update_product_stock",
                &json!({"product_name": "widget", "new_quantity": 40}),
                &actor,
            )
            .await;
        assert!(result.success);
        assert!(result.user_text().contains("from 5 to 40"));
    }

    #[tokio::test]
    async fn daily_sales_rejects_malformed_date() {
        let fx = fixture();
        let actor = seed_user(&fx.store, "bob", Role::Admin);
        let result = fx
            .dispatcher
            .execute("get_daily_sales", &json!({"date": "last tuesday"}), &actor)
            .await;
        assert_eq!(result.error_kind, Some(ErrorKind::Validation));
        assert!(result.user_text().contains("YYYY-MM-DD"));
    }

    #[tokio::test]
    async fn low_stock_defaults_threshold_to_ten() {
        let fx = fixture();
        seed_widget(&fx.store, 9);
        let actor = seed_user(&fx.store, "alice", Role::User);

        let result = fx
            .dispatcher
            .execute("get_low_stock_products", &json!({}), &actor)
            .await;
        assert!(result.success);
        assert_eq!(result.data["products"][0]["name"], json!("Widget"));
    }

    #[tokio::test]
    async fn profit_loss_with_no_sales_reports_zero_margin() {
        let fx = fixture();
        let actor = seed_user(&fx.store, "bob", Role::Admin);
        let result = fx
            .dispatcher
            .execute("get_profit_loss_report", &json!({}), &actor)
            .await;
        assert!(result.success);
        assert_eq!(result.data["profit_margin"], json!(0.0));
        assert!(result.user_text().contains("No sales"));
    }

    #[tokio::test]
    async fn profit_loss_over_a_sale() {
        let fx = fixture();
        seed_widget(&fx.store, 10);
        let cashier = seed_user(&fx.store, "alice", Role::User);
        let admin = seed_user(&fx.store, "bob", Role::Admin);

        let sale = fx
            .dispatcher
            .execute(
                "create_bill",
                &json!({"items": [{"product_name": "Widget", "quantity": 2}]}),
                &cashier,
            )
            .await;
        assert!(sale.success);

        let result = fx
            .dispatcher
            .execute("get_profit_loss_report", &json!({}), &admin)
            .await;
        assert!(result.success);
        assert_eq!(result.data["total_revenue"], json!(20.0));
        assert_eq!(result.data["total_cost"], json!(12.0));
        assert_eq!(result.data["profit"], json!(8.0));
    }

    #[tokio::test]
    async fn get_all_users_counts_roles() {
        let fx = fixture();
        seed_user(&fx.store, "alice", Role::User);
        seed_user(&fx.store, "bob", Role::Admin);
        let root = seed_user(&fx.store, "root", Role::SuperAdmin);

        let result = fx.dispatcher.execute("get_all_users", &json!({}), &root).await;
        assert!(result.success);
        assert_eq!(result.data["total_count"], json!(3));
        assert_eq!(result.data["active_count"], json!(3));
        assert!(result.user_text().contains("There are 3 users"));
    }

    #[tokio::test]
    async fn create_user_hashes_password_and_rejects_duplicates() {
        let fx = fixture();
        let root = seed_user(&fx.store, "root", Role::SuperAdmin);

        let result = fx
            .dispatcher
            .execute(
                "create_user",
                &json!({
                    "username": "carol",
                    "password": "hunter2",
                    "full_name": "Carol Doe",
                    "email": "carol@example.com",
                    "role": "admin"
                }),
                &root,
            )
            .await;
        assert!(result.success, "unexpected failure: {:?}", result.error);

        let stored = fx
            .store
            .find_by_username("carol")
            .await
            .expect("query")
            .expect("user exists");
        assert_eq!(stored.password_hash, "hashed:hunter2");
        assert_eq!(stored.role, Role::Admin);

        let duplicate = fx
            .dispatcher
            .execute(
                "create_user",
                &json!({
                    "username": "carol",
                    "password": "other",
                    "full_name": "Other",
                    "email": "other@example.com",
                    "role": "user"
                }),
                &root,
            )
            .await;
        assert_eq!(duplicate.error_kind, Some(ErrorKind::Duplicate));
    }

    #[tokio::test]
    async fn create_user_rejects_unknown_role() {
        let fx = fixture();
        let root = seed_user(&fx.store, "root", Role::SuperAdmin);
        let result = fx
            .dispatcher
            .execute(
                "create_user",
                &json!({
                    "username": "carol",
                    "password": "pw",
                    "full_name": "Carol",
                    "email": "carol@example.com",
                    "role": "owner"
                }),
                &root,
            )
            .await;
        assert_eq!(result.error_kind, Some(ErrorKind::Validation));
    }

    #[tokio::test]
    async fn delete_user_blocks_self_deletion() {
        let fx = fixture();
        let root = seed_user(&fx.store, "root", Role::SuperAdmin);
        let result = fx
            .dispatcher
            .execute("delete_user", &json!({"username": "root"}), &root)
            .await;
        assert!(!result.success);
        assert_eq!(result.error_kind, Some(ErrorKind::Validation));
        assert!(result.user_text().contains("your own account"));
    }

    #[tokio::test]
    async fn delete_user_handles_unknown_and_success() {
        let fx = fixture();
        let root = seed_user(&fx.store, "root", Role::SuperAdmin);
        seed_user(&fx.store, "gone", Role::User);

        let missing = fx
            .dispatcher
            .execute("delete_user", &json!({"username": "nobody"}), &root)
            .await;
        assert_eq!(missing.error_kind, Some(ErrorKind::NotFound));

        let deleted = fx
            .dispatcher
            .execute("delete_user", &json!({"username": "gone"}), &root)
            .await;
        assert!(deleted.success);
        assert!(
            fx.store
                .find_by_username("gone")
                .await
                .expect("query")
                .is_none()
        );
    }

    #[tokio::test]
    async fn read_only_tools_are_idempotent() {
        let fx = fixture();
        seed_widget(&fx.store, 5);
        let actor = seed_user(&fx.store, "alice", Role::User);

        let first = fx
            .dispatcher
            .execute("list_all_products", &json!({}), &actor)
            .await;
        let second = fx
            .dispatcher
            .execute("list_all_products", &json!({}), &actor)
            .await;
        assert_eq!(first, second);

        let stock_a = fx
            .dispatcher
            .execute("check_product_stock", &json!({"product_name": "Widget"}), &actor)
            .await;
        let stock_b = fx
            .dispatcher
            .execute("check_product_stock", &json!({"product_name": "Widget"}), &actor)
            .await;
        assert_eq!(stock_a, stock_b);
    }

    #[tokio::test]
    async fn null_arguments_behave_as_empty_object() {
        let fx = fixture();
        let actor = seed_user(&fx.store, "alice", Role::User);
        let result = fx
            .dispatcher
            .execute("list_all_products", &JsonValue::Null, &actor)
            .await;
        assert!(result.success);
    }
}
