//! The assistant tool catalog and result envelope.
//!
//! The twelve operations the model may request form a closed set: adding
//! or removing one is a compile-time-checked change through [`ToolName`],
//! and the dispatcher matches on it exhaustively. Each definition's
//! parameter schema is the authoritative input validation for arguments
//! arriving from the model.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue, json};
use std::fmt;
use std::str::FromStr;

/// The closed set of operations the assistant can perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolName {
    CreateBill,
    CheckProductStock,
    GetProductPrice,
    ListAllProducts,
    AddProduct,
    UpdateProductStock,
    GetDailySales,
    GetLowStockProducts,
    GetProfitLossReport,
    GetAllUsers,
    CreateUser,
    DeleteUser,
}

impl ToolName {
    /// Catalog order. Stable; mirrors the order tools are presented to
    /// the model.
    pub const ALL: [ToolName; 12] = [
        Self::CreateBill,
        Self::CheckProductStock,
        Self::GetProductPrice,
        Self::ListAllProducts,
        Self::AddProduct,
        Self::UpdateProductStock,
        Self::GetDailySales,
        Self::GetLowStockProducts,
        Self::GetProfitLossReport,
        Self::GetAllUsers,
        Self::CreateUser,
        Self::DeleteUser,
    ];

    /// The wire name of the tool.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateBill => "create_bill",
            Self::CheckProductStock => "check_product_stock",
            Self::GetProductPrice => "get_product_price",
            Self::ListAllProducts => "list_all_products",
            Self::AddProduct => "add_product",
            Self::UpdateProductStock => "update_product_stock",
            Self::GetDailySales => "get_daily_sales",
            Self::GetLowStockProducts => "get_low_stock_products",
            Self::GetProfitLossReport => "get_profit_loss_report",
            Self::GetAllUsers => "get_all_users",
            Self::CreateUser => "create_user",
            Self::DeleteUser => "delete_user",
        }
    }

    /// The tool's definition: description and parameter schema.
    #[must_use]
    pub fn definition(&self) -> ToolDefinition {
        match self {
            Self::CreateBill => ToolDefinition::new(
                *self,
                "Create a new bill/sale with the specified products. Use this when the \
                 user wants to generate a bill, make a sale, or checkout items.",
                json!({
                    "type": "object",
                    "properties": {
                        "items": {
                            "type": "array",
                            "description": "List of products to include in the bill",
                            "items": {
                                "type": "object",
                                "properties": {
                                    "product_name": {
                                        "type": "string",
                                        "description": "Name of the product (case insensitive, partial match allowed)"
                                    },
                                    "quantity": {
                                        "type": "integer",
                                        "description": "Quantity to purchase"
                                    }
                                },
                                "required": ["product_name", "quantity"]
                            }
                        }
                    },
                    "required": ["items"]
                }),
            ),
            Self::CheckProductStock => ToolDefinition::new(
                *self,
                "Check the current stock/inventory level of a specific product",
                json!({
                    "type": "object",
                    "properties": {
                        "product_name": {
                            "type": "string",
                            "description": "Name of the product to check"
                        }
                    },
                    "required": ["product_name"]
                }),
            ),
            Self::GetProductPrice => ToolDefinition::new(
                *self,
                "Get the selling price of a product",
                json!({
                    "type": "object",
                    "properties": {
                        "product_name": {
                            "type": "string",
                            "description": "Name of the product"
                        }
                    },
                    "required": ["product_name"]
                }),
            ),
            Self::ListAllProducts => ToolDefinition::new(
                *self,
                "List all products in the store with their stock and prices",
                json!({
                    "type": "object",
                    "properties": {},
                    "required": []
                }),
            ),
            Self::AddProduct => ToolDefinition::new(
                *self,
                "Add a new product to the store inventory. Requires admin or super_admin role.",
                json!({
                    "type": "object",
                    "properties": {
                        "name": {
                            "type": "string",
                            "description": "Product name"
                        },
                        "quantity": {
                            "type": "integer",
                            "description": "Initial stock quantity"
                        },
                        "purchase_price": {
                            "type": "number",
                            "description": "Purchase/cost price"
                        },
                        "selling_price": {
                            "type": "number",
                            "description": "Selling price"
                        }
                    },
                    "required": ["name", "quantity", "purchase_price", "selling_price"]
                }),
            ),
            Self::UpdateProductStock => ToolDefinition::new(
                *self,
                "Update the stock quantity of a product. Requires admin or super_admin role.",
                json!({
                    "type": "object",
                    "properties": {
                        "product_name": {
                            "type": "string",
                            "description": "Name of the product to update"
                        },
                        "new_quantity": {
                            "type": "integer",
                            "description": "New stock quantity"
                        }
                    },
                    "required": ["product_name", "new_quantity"]
                }),
            ),
            Self::GetDailySales => ToolDefinition::new(
                *self,
                "Get total sales for today or a specific date. Requires admin or super_admin role.",
                json!({
                    "type": "object",
                    "properties": {
                        "date": {
                            "type": "string",
                            "description": "Date in YYYY-MM-DD format. Leave empty for today."
                        }
                    },
                    "required": []
                }),
            ),
            Self::GetLowStockProducts => ToolDefinition::new(
                *self,
                "Get products with low stock (less than specified threshold)",
                json!({
                    "type": "object",
                    "properties": {
                        "threshold": {
                            "type": "integer",
                            "description": "Stock threshold (default: 10)"
                        }
                    },
                    "required": []
                }),
            ),
            Self::GetProfitLossReport => ToolDefinition::new(
                *self,
                "Get profit and loss report for today or a date range. Shows revenue, \
                 costs, and profit. Requires admin or super_admin role.",
                json!({
                    "type": "object",
                    "properties": {
                        "start_date": {
                            "type": "string",
                            "description": "Start date in YYYY-MM-DD format. Leave empty for today."
                        },
                        "end_date": {
                            "type": "string",
                            "description": "End date in YYYY-MM-DD format. Leave empty for today."
                        }
                    },
                    "required": []
                }),
            ),
            Self::GetAllUsers => ToolDefinition::new(
                *self,
                "Get a list of all users in the system. Requires admin or super_admin role.",
                json!({
                    "type": "object",
                    "properties": {},
                    "required": []
                }),
            ),
            Self::CreateUser => ToolDefinition::new(
                *self,
                "Create a new user account. Requires super_admin role.",
                json!({
                    "type": "object",
                    "properties": {
                        "username": {
                            "type": "string",
                            "description": "Username for the new user"
                        },
                        "password": {
                            "type": "string",
                            "description": "Password for the new user"
                        },
                        "full_name": {
                            "type": "string",
                            "description": "Full name of the user"
                        },
                        "email": {
                            "type": "string",
                            "description": "Email address of the user"
                        },
                        "role": {
                            "type": "string",
                            "description": "Role of the user: user, admin, or super_admin"
                        }
                    },
                    "required": ["username", "password", "full_name", "email", "role"]
                }),
            ),
            Self::DeleteUser => ToolDefinition::new(
                *self,
                "Delete a user account by username. Requires super_admin role.",
                json!({
                    "type": "object",
                    "properties": {
                        "username": {
                            "type": "string",
                            "description": "Username of the user to delete"
                        }
                    },
                    "required": ["username"]
                }),
            ),
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a tool name is not in the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownToolName(pub String);

impl fmt::Display for UnknownToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown tool: {}", self.0)
    }
}

impl std::error::Error for UnknownToolName {}

impl FromStr for ToolName {
    type Err = UnknownToolName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|name| name.as_str() == s)
            .copied()
            .ok_or_else(|| UnknownToolName(s.to_string()))
    }
}

/// Definition of one catalog tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique tool name.
    pub name: ToolName,
    /// Human-readable description shown to the model.
    pub description: String,
    /// JSON schema for input parameters. Authoritative validation.
    pub parameters: JsonValue,
}

impl ToolDefinition {
    fn new(name: ToolName, description: impl Into<String>, parameters: JsonValue) -> Self {
        Self {
            name,
            description: description.into(),
            parameters,
        }
    }
}

/// The full catalog in stable order.
#[must_use]
pub fn catalog() -> Vec<ToolDefinition> {
    ToolName::ALL.iter().map(ToolName::definition).collect()
}

/// The kind of a tool failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Missing or malformed arguments.
    Validation,
    /// Unresolved product or user reference.
    NotFound,
    /// Requested quantity exceeds availability.
    InsufficientStock,
    /// Acting user's role is below the tool's minimum.
    Authorization,
    /// Name, username, or email collision.
    Duplicate,
    /// Tool name not in the catalog.
    UnknownTool,
    /// Model gateway unreachable or malformed.
    External,
    /// Unexpected internal failure.
    Internal,
}

/// Uniform result envelope for every tool execution.
///
/// Exactly one of `message` (success) and `error` (failure) is the
/// user-facing text; `data` carries the tool-specific payload keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Whether the invocation succeeded.
    pub success: bool,
    /// Tool-specific payload.
    #[serde(flatten)]
    pub data: Map<String, JsonValue>,
    /// Human-readable success message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Human-readable error text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Failure kind; absent on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl ToolResult {
    /// Creates a successful result with a user-facing message.
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Map::new(),
            message: Some(message.into()),
            error: None,
            error_kind: None,
        }
    }

    /// Creates a failed result.
    #[must_use]
    pub fn failure(kind: ErrorKind, error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: Map::new(),
            message: None,
            error: Some(error.into()),
            error_kind: Some(kind),
        }
    }

    /// Attaches a payload field.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: JsonValue) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    /// The user-facing text: the message on success, the error otherwise.
    #[must_use]
    pub fn user_text(&self) -> &str {
        if self.success {
            self.message.as_deref().unwrap_or("Done!")
        } else {
            self.error
                .as_deref()
                .unwrap_or("Sorry, something went wrong.")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_has_all_twelve_tools_in_order() {
        let defs = catalog();
        assert_eq!(defs.len(), 12);
        assert_eq!(defs[0].name, ToolName::CreateBill);
        assert_eq!(defs[11].name, ToolName::DeleteUser);
    }

    #[test]
    fn tool_name_round_trips_through_wire_name() {
        for name in ToolName::ALL {
            let parsed: ToolName = name.as_str().parse().expect("should parse");
            assert_eq!(parsed, name);
        }
    }

    #[test]
    fn unknown_tool_name_is_rejected() {
        let err = "drop_all_tables".parse::<ToolName>().unwrap_err();
        assert!(err.to_string().contains("drop_all_tables"));
    }

    #[test]
    fn schemas_declare_required_fields() {
        let def = ToolName::CreateUser.definition();
        let required = def.parameters["required"]
            .as_array()
            .expect("required array");
        assert_eq!(required.len(), 5);

        let def = ToolName::ListAllProducts.definition();
        assert!(def.parameters["required"].as_array().expect("array").is_empty());
    }

    #[test]
    fn success_envelope_serializes_payload_flat() {
        let result = ToolResult::success("Widget has 5 units in stock")
            .with("quantity", json!(5))
            .with("product_name", json!("Widget"));
        let value = serde_json::to_value(&result).expect("serialize");
        assert_eq!(value["success"], json!(true));
        assert_eq!(value["quantity"], json!(5));
        assert!(value.get("error").is_none());
    }

    #[test]
    fn failure_envelope_carries_kind_and_error() {
        let result = ToolResult::failure(ErrorKind::NotFound, "Product 'X' not found");
        assert!(!result.success);
        assert_eq!(result.error_kind, Some(ErrorKind::NotFound));
        assert_eq!(result.user_text(), "Product 'X' not found");
    }

    #[test]
    fn user_text_prefers_message_on_success() {
        let result = ToolResult::success("All done");
        assert_eq!(result.user_text(), "All done");
    }
}
