//! System prompt construction.
//!
//! The prompt is installed into a session once, on its first user turn,
//! and embeds the acting user's role and a snapshot of current inventory.

use storefront_domain::{Product, Role};

/// Renders the inventory snapshot embedded in the system prompt.
#[must_use]
pub fn inventory_snapshot(products: &[Product]) -> String {
    if products.is_empty() {
        return "The store currently has no products in inventory.".to_string();
    }
    let lines: Vec<String> = products
        .iter()
        .map(|p| {
            format!(
                "- {}: {} in stock, sells for ${:.2}",
                p.name, p.quantity, p.selling_price
            )
        })
        .collect();
    format!("Current store inventory:\n{}", lines.join("\n"))
}

/// Builds the role-specific system prompt.
#[must_use]
pub fn system_prompt(role: Role, store_context: &str) -> String {
    let permissions = match role {
        Role::User => "create bills/sales, check product stock and prices",
        Role::Admin => {
            "create bills/sales, check stock/prices, add/update products, view sales reports"
        }
        Role::SuperAdmin => "all operations including user management",
    };

    format!(
        "You are a helpful Store Assistant for a retail management system.\n\
         The current user has the role: {role}\n\
         They can: {permissions}\n\
         \n\
         You can help users with:\n\
         - Creating bills/sales by specifying products and quantities\n\
         - Checking product stock and prices\n\
         - Managing inventory (for admin roles)\n\
         - Viewing sales reports (for admin roles)\n\
         - Managing users (creating/deleting) (for super_admin only)\n\
         \n\
         When users want to make a purchase or create a bill, use the create_bill function.\n\
         When they ask about stock, use check_product_stock.\n\
         When they ask about prices, use get_product_price.\n\
         \n\
         Keep responses concise and natural since they will be spoken aloud.\n\
         Confirm actions after they are completed.\n\
         \n\
         {store_context}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn product(name: &str, quantity: i32, price: f64) -> Product {
        let now = Utc::now();
        Product {
            id: 1,
            name: name.to_string(),
            quantity,
            purchase_price: 1.0,
            selling_price: price,
            category: None,
            supplier: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn snapshot_lists_products_with_prices() {
        let snapshot = inventory_snapshot(&[product("Widget", 5, 10.0)]);
        assert!(snapshot.contains("Widget: 5 in stock, sells for $10.00"));
    }

    #[test]
    fn snapshot_of_empty_inventory() {
        let snapshot = inventory_snapshot(&[]);
        assert!(snapshot.contains("no products"));
    }

    #[test]
    fn prompt_names_role_and_permissions() {
        let prompt = system_prompt(Role::Admin, "inventory here");
        assert!(prompt.contains("the role: admin"));
        assert!(prompt.contains("view sales reports"));
        assert!(prompt.contains("inventory here"));
    }

    #[test]
    fn super_admin_prompt_mentions_user_management() {
        let prompt = system_prompt(Role::SuperAdmin, "");
        assert!(prompt.contains("all operations including user management"));
    }
}
