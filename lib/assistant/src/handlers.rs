//! The twelve domain operation handlers.
//!
//! Handlers run after the dispatcher has validated arguments against the
//! tool schema and checked the acting user's role. They deserialize the
//! argument mapping into typed structs, drive the store traits, and build
//! the success envelope; every failure is a typed [`DomainError`] the
//! dispatcher folds into a failure envelope.

use crate::dispatch::Dispatcher;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{Value as JsonValue, json};
use storefront_conversation::ToolResult;
use storefront_domain::{
    BillRequestLine, DomainError, NewProduct, NewUser, Role, User,
};

fn parse_args<T: serde::de::DeserializeOwned>(args: &JsonValue) -> Result<T, DomainError> {
    serde_json::from_value(args.clone())
        .map_err(|e| DomainError::validation("arguments", e.to_string()))
}

fn parse_date(field: &str, value: &str) -> Result<NaiveDate, DomainError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| DomainError::validation(field, "expected YYYY-MM-DD"))
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

// ── Billing ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct CreateBillArgs {
    items: Vec<RequestedLine>,
}

#[derive(Debug, Deserialize)]
struct RequestedLine {
    product_name: String,
    quantity: i32,
}

pub(crate) async fn create_bill(
    cx: &Dispatcher,
    args: &JsonValue,
    actor: &User,
) -> Result<ToolResult, DomainError> {
    let args: CreateBillArgs = parse_args(args)?;
    if args.items.is_empty() {
        return Err(DomainError::validation(
            "items",
            "no items specified for the bill",
        ));
    }

    // Resolve and pre-validate every line before anything mutates; the
    // store re-validates under its own lock when committing.
    let mut lines = Vec::with_capacity(args.items.len());
    for item in &args.items {
        if item.quantity <= 0 {
            return Err(DomainError::validation("quantity", "must be positive"));
        }
        let product = cx.products.resolve_by_name(&item.product_name).await?;
        if product.quantity < item.quantity {
            return Err(DomainError::InsufficientStock {
                product: product.name,
                requested: item.quantity,
                available: product.quantity,
            });
        }
        lines.push(BillRequestLine {
            product_id: product.id,
            quantity: item.quantity,
        });
    }

    let bill = cx.bills.create(actor.id, &lines).await?;

    let item_summaries: Vec<String> = bill
        .items
        .iter()
        .map(|i| format!("{}x {} @ ${:.2}", i.quantity, i.product_name, i.price_per_unit))
        .collect();

    Ok(ToolResult::success(format!(
        "Bill {} created successfully! Total: ${:.2}",
        bill.bill.bill_number, bill.bill.total_amount
    ))
    .with("bill_id", json!(bill.bill.id))
    .with("bill_number", json!(bill.bill.bill_number))
    .with("total_amount", json!(bill.bill.total_amount))
    .with("items", json!(item_summaries)))
}

// ── Stock and price queries ────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ProductNameArgs {
    product_name: String,
}

pub(crate) async fn check_product_stock(
    cx: &Dispatcher,
    args: &JsonValue,
) -> Result<ToolResult, DomainError> {
    let args: ProductNameArgs = parse_args(args)?;
    let product = cx.products.resolve_by_name(&args.product_name).await?;
    Ok(ToolResult::success(format!(
        "{} has {} units in stock",
        product.name, product.quantity
    ))
    .with("product_name", json!(product.name))
    .with("quantity", json!(product.quantity)))
}

pub(crate) async fn get_product_price(
    cx: &Dispatcher,
    args: &JsonValue,
) -> Result<ToolResult, DomainError> {
    let args: ProductNameArgs = parse_args(args)?;
    let product = cx.products.resolve_by_name(&args.product_name).await?;
    Ok(ToolResult::success(format!(
        "{} costs ${:.2}",
        product.name, product.selling_price
    ))
    .with("product_name", json!(product.name))
    .with("selling_price", json!(product.selling_price)))
}

pub(crate) async fn list_all_products(cx: &Dispatcher) -> Result<ToolResult, DomainError> {
    let products = cx.products.list().await?;
    if products.is_empty() {
        return Ok(
            ToolResult::success("No products in inventory").with("products", json!([]))
        );
    }

    let listing: Vec<JsonValue> = products
        .iter()
        .map(|p| {
            json!({
                "name": p.name,
                "quantity": p.quantity,
                "price": p.selling_price,
            })
        })
        .collect();
    let summary: Vec<String> = products
        .iter()
        .map(|p| format!("{} ({} @ ${:.2})", p.name, p.quantity, p.selling_price))
        .collect();

    Ok(ToolResult::success(format!(
        "Products in store: {}",
        summary.join(", ")
    ))
    .with("products", json!(listing)))
}

pub(crate) async fn get_low_stock_products(
    cx: &Dispatcher,
    args: &JsonValue,
) -> Result<ToolResult, DomainError> {
    #[derive(Debug, Deserialize)]
    struct LowStockArgs {
        threshold: Option<i32>,
    }
    let args: LowStockArgs = parse_args(args)?;
    let threshold = args.threshold.unwrap_or(10);

    let products = cx.products.low_stock(threshold).await?;
    if products.is_empty() {
        return Ok(
            ToolResult::success(format!("No products below {threshold} units"))
                .with("products", json!([])),
        );
    }

    let listing: Vec<JsonValue> = products
        .iter()
        .map(|p| json!({"name": p.name, "quantity": p.quantity}))
        .collect();
    let summary: Vec<String> = products
        .iter()
        .map(|p| format!("{} ({})", p.name, p.quantity))
        .collect();

    Ok(ToolResult::success(format!(
        "Low stock products: {}",
        summary.join(", ")
    ))
    .with("products", json!(listing)))
}

// ── Inventory mutation ─────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct AddProductArgs {
    name: String,
    quantity: i32,
    purchase_price: f64,
    selling_price: f64,
}

pub(crate) async fn add_product(
    cx: &Dispatcher,
    args: &JsonValue,
) -> Result<ToolResult, DomainError> {
    let args: AddProductArgs = parse_args(args)?;
    let new = NewProduct {
        name: args.name,
        quantity: args.quantity,
        purchase_price: args.purchase_price,
        selling_price: args.selling_price,
        category: None,
        supplier: None,
    };
    new.validate()?;
    let product = cx.products.insert(new).await?;
    Ok(ToolResult::success(format!(
        "Product '{}' added successfully with {} units at ${:.2}",
        product.name, product.quantity, product.selling_price
    )))
}

#[derive(Debug, Deserialize)]
struct UpdateStockArgs {
    product_name: String,
    new_quantity: i32,
}

pub(crate) async fn update_product_stock(
    cx: &Dispatcher,
    args: &JsonValue,
) -> Result<ToolResult, DomainError> {
    let args: UpdateStockArgs = parse_args(args)?;
    let product = cx.products.resolve_by_name(&args.product_name).await?;
    let old_quantity = product.quantity;
    let updated = cx.products.set_quantity(product.id, args.new_quantity).await?;
    Ok(ToolResult::success(format!(
        "Updated {} stock from {} to {} units",
        updated.name, old_quantity, updated.quantity
    )))
}

// ── Reporting ──────────────────────────────────────────────────────

pub(crate) async fn get_daily_sales(
    cx: &Dispatcher,
    args: &JsonValue,
) -> Result<ToolResult, DomainError> {
    #[derive(Debug, Deserialize)]
    struct DailySalesArgs {
        date: Option<String>,
    }
    let args: DailySalesArgs = parse_args(args)?;
    let date = match args.date.as_deref().filter(|d| !d.is_empty()) {
        Some(raw) => parse_date("date", raw)?,
        None => today(),
    };

    let summary = cx.bills.daily_sales(date).await?;
    Ok(ToolResult::success(format!(
        "Sales for {}: {} bills totaling ${:.2}",
        summary.date, summary.total_bills, summary.total_sales
    ))
    .with("date", json!(summary.date.to_string()))
    .with("total_bills", json!(summary.total_bills))
    .with("total_sales", json!(summary.total_sales)))
}

pub(crate) async fn get_profit_loss_report(
    cx: &Dispatcher,
    args: &JsonValue,
) -> Result<ToolResult, DomainError> {
    #[derive(Debug, Deserialize)]
    struct ProfitLossArgs {
        start_date: Option<String>,
        end_date: Option<String>,
    }
    let args: ProfitLossArgs = parse_args(args)?;
    let start = match args.start_date.as_deref().filter(|d| !d.is_empty()) {
        Some(raw) => parse_date("start_date", raw)?,
        None => today(),
    };
    let end = match args.end_date.as_deref().filter(|d| !d.is_empty()) {
        Some(raw) => parse_date("end_date", raw)?,
        None => today(),
    };

    let report = cx.bills.profit_loss(start, end).await?;
    let date_range = if start == end {
        format!("on {start}")
    } else {
        format!("from {start} to {end}")
    };

    if report.total_bills == 0 {
        return Ok(ToolResult::success(format!(
            "No sales {date_range}. Revenue: $0, Cost: $0, Profit: $0"
        ))
        .with("total_revenue", json!(0.0))
        .with("total_cost", json!(0.0))
        .with("profit", json!(0.0))
        .with("profit_margin", json!(0.0)));
    }

    let margin = (report.profit_margin * 100.0).round() / 100.0;
    let profit_status = if report.profit >= 0.0 { "Profit" } else { "Loss" };
    Ok(ToolResult::success(format!(
        "Profit/Loss report {date_range}: Revenue ${:.2}, Cost ${:.2}, {profit_status} ${:.2} ({:.1}% margin)",
        report.total_revenue,
        report.total_cost,
        report.profit.abs(),
        report.profit_margin
    ))
    .with(
        "date_range",
        json!({"start": start.to_string(), "end": end.to_string()}),
    )
    .with("total_bills", json!(report.total_bills))
    .with("total_revenue", json!(report.total_revenue))
    .with("total_cost", json!(report.total_cost))
    .with("profit", json!(report.profit))
    .with("profit_margin", json!(margin)))
}

// ── User administration ────────────────────────────────────────────

pub(crate) async fn get_all_users(cx: &Dispatcher) -> Result<ToolResult, DomainError> {
    let users = cx.users.list().await?;
    if users.is_empty() {
        return Ok(
            ToolResult::success("No users found in the system").with("users", json!([]))
        );
    }

    let listing: Vec<JsonValue> = users
        .iter()
        .map(|u| {
            json!({
                "username": u.username,
                "full_name": u.full_name,
                "role": u.role,
                "is_active": u.is_active,
            })
        })
        .collect();
    let active_count = users.iter().filter(|u| u.is_active).count();

    let role_summary: Vec<String> = [Role::User, Role::Admin, Role::SuperAdmin]
        .iter()
        .filter_map(|role| {
            let count = users.iter().filter(|u| u.role == *role).count();
            (count > 0).then(|| format!("{count} {role}s"))
        })
        .collect();

    let mut names: Vec<String> = users.iter().take(5).map(|u| u.username.clone()).collect();
    if users.len() > 5 {
        names.push(format!("and {} more", users.len() - 5));
    }

    Ok(ToolResult::success(format!(
        "There are {} users: {}. Users: {}",
        users.len(),
        role_summary.join(", "),
        names.join(", ")
    ))
    .with("users", json!(listing))
    .with("total_count", json!(users.len()))
    .with("active_count", json!(active_count)))
}

#[derive(Debug, Deserialize)]
struct CreateUserArgs {
    username: String,
    password: String,
    full_name: String,
    email: String,
    role: String,
}

pub(crate) async fn create_user(
    cx: &Dispatcher,
    args: &JsonValue,
) -> Result<ToolResult, DomainError> {
    let args: CreateUserArgs = parse_args(args)?;
    let role: Role = args.role.parse()?;
    let password_hash = cx.hasher.hash(&args.password)?;

    let user = cx
        .users
        .insert(NewUser {
            username: args.username,
            password_hash,
            full_name: args.full_name,
            email: args.email,
            role,
        })
        .await?;

    Ok(ToolResult::success(format!(
        "User '{}' created successfully as {}",
        user.username, user.role
    )))
}

#[derive(Debug, Deserialize)]
struct DeleteUserArgs {
    username: String,
}

pub(crate) async fn delete_user(
    cx: &Dispatcher,
    args: &JsonValue,
    actor: &User,
) -> Result<ToolResult, DomainError> {
    let args: DeleteUserArgs = parse_args(args)?;
    let target = cx
        .users
        .find_by_username(&args.username)
        .await?
        .ok_or(DomainError::NotFound {
            entity: "User",
            key: args.username.clone(),
        })?;

    if target.id == actor.id {
        return Err(DomainError::SelfDeletion);
    }

    cx.users.delete(target.id).await?;
    Ok(ToolResult::success(format!(
        "User '{}' deleted successfully",
        target.username
    )))
}
