//! In-memory store implementation.
//!
//! Backs the assistant's tests and serves as the reference for the
//! transactional semantics the Postgres stores must match. All state lives
//! behind a single mutex, so every operation is trivially atomic; the lock
//! is never held across an await point.

use crate::bill::{Bill, BillItem, BillRequestLine, BillWithItems, format_bill_number};
use crate::error::DomainError;
use crate::product::{self, NewProduct, Product, ProductUpdate};
use crate::report::{BillSummary, ProfitLossReport, SalesSummary};
use crate::store::{BillStore, ProductStore, UserStore};
use crate::user::{NewUser, User};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct MemoryState {
    products: Vec<Product>,
    bills: Vec<Bill>,
    bill_items: Vec<BillItem>,
    users: Vec<User>,
    next_product_id: i64,
    next_bill_id: i64,
    next_item_id: i64,
    next_user_id: i64,
}

/// Shared in-memory store implementing all three store traits.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a product directly, bypassing duplicate checks. Test setup.
    pub fn seed_product(&self, new: NewProduct) -> Product {
        let mut state = self.lock();
        state.next_product_id += 1;
        let now = Utc::now();
        let product = Product {
            id: state.next_product_id,
            name: new.name,
            quantity: new.quantity,
            purchase_price: new.purchase_price,
            selling_price: new.selling_price,
            category: new.category,
            supplier: new.supplier,
            created_at: now,
            updated_at: now,
        };
        state.products.push(product.clone());
        product
    }

    /// Seeds a user directly, bypassing duplicate checks. Test setup.
    pub fn seed_user(&self, new: NewUser) -> User {
        let mut state = self.lock();
        state.next_user_id += 1;
        let user = User {
            id: state.next_user_id,
            username: new.username,
            password_hash: new.password_hash,
            full_name: new.full_name,
            email: new.email,
            role: new.role,
            is_active: true,
            created_at: Utc::now(),
        };
        state.users.push(user.clone());
        user
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        // A poisoned lock means a panicking test; propagate the panic.
        self.inner.lock().expect("memory store lock poisoned")
    }

    fn with_items(state: &MemoryState, bill: &Bill) -> BillWithItems {
        BillWithItems {
            bill: bill.clone(),
            items: state
                .bill_items
                .iter()
                .filter(|i| i.bill_id == bill.id)
                .cloned()
                .collect(),
        }
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn list(&self) -> Result<Vec<Product>, DomainError> {
        let state = self.lock();
        let mut products = state.products.clone();
        products.sort_by_key(|p| p.id);
        Ok(products)
    }

    async fn get(&self, id: i64) -> Result<Option<Product>, DomainError> {
        let state = self.lock();
        Ok(state.products.iter().find(|p| p.id == id).cloned())
    }

    async fn resolve_by_name(&self, name: &str) -> Result<Product, DomainError> {
        let state = self.lock();
        product::resolve_by_name(&state.products, name).cloned()
    }

    async fn insert(&self, new: NewProduct) -> Result<Product, DomainError> {
        new.validate()?;
        let mut state = self.lock();
        let lowered = new.name.to_lowercase();
        if state.products.iter().any(|p| p.name.to_lowercase() == lowered) {
            return Err(DomainError::Duplicate {
                entity: "Product",
                value: new.name,
            });
        }
        state.next_product_id += 1;
        let now = Utc::now();
        let product = Product {
            id: state.next_product_id,
            name: new.name,
            quantity: new.quantity,
            purchase_price: new.purchase_price,
            selling_price: new.selling_price,
            category: new.category,
            supplier: new.supplier,
            created_at: now,
            updated_at: now,
        };
        state.products.push(product.clone());
        Ok(product)
    }

    async fn update(&self, id: i64, update: ProductUpdate) -> Result<Product, DomainError> {
        let mut state = self.lock();
        let product = state
            .products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(DomainError::NotFound {
                entity: "Product",
                key: id.to_string(),
            })?;
        if let Some(name) = update.name {
            product.name = name;
        }
        if let Some(quantity) = update.quantity {
            if quantity < 0 {
                return Err(DomainError::validation("quantity", "must not be negative"));
            }
            product.quantity = quantity;
        }
        if let Some(price) = update.purchase_price {
            product.purchase_price = price;
        }
        if let Some(price) = update.selling_price {
            product.selling_price = price;
        }
        if let Some(category) = update.category {
            product.category = Some(category);
        }
        if let Some(supplier) = update.supplier {
            product.supplier = Some(supplier);
        }
        product.updated_at = Utc::now();
        Ok(product.clone())
    }

    async fn delete(&self, id: i64) -> Result<(), DomainError> {
        let mut state = self.lock();
        let before = state.products.len();
        state.products.retain(|p| p.id != id);
        if state.products.len() == before {
            return Err(DomainError::NotFound {
                entity: "Product",
                key: id.to_string(),
            });
        }
        Ok(())
    }

    async fn set_quantity(&self, id: i64, quantity: i32) -> Result<Product, DomainError> {
        if quantity < 0 {
            return Err(DomainError::validation(
                "new_quantity",
                "must not be negative",
            ));
        }
        let mut state = self.lock();
        let product = state
            .products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(DomainError::NotFound {
                entity: "Product",
                key: id.to_string(),
            })?;
        product.quantity = quantity;
        product.updated_at = Utc::now();
        Ok(product.clone())
    }

    async fn low_stock(&self, threshold: i32) -> Result<Vec<Product>, DomainError> {
        let state = self.lock();
        let mut products: Vec<Product> = state
            .products
            .iter()
            .filter(|p| p.quantity < threshold)
            .cloned()
            .collect();
        products.sort_by_key(|p| p.id);
        Ok(products)
    }
}

#[async_trait]
impl BillStore for MemoryStore {
    async fn create(
        &self,
        created_by: i64,
        lines: &[BillRequestLine],
    ) -> Result<BillWithItems, DomainError> {
        if lines.is_empty() {
            return Err(DomainError::validation("items", "must not be empty"));
        }
        let mut state = self.lock();

        // Validation pass over scratch quantities so a product referenced
        // by several lines cannot be driven negative. Name and price are
        // snapshotted here; the lock is held throughout.
        let mut remaining: HashMap<i64, i32> = HashMap::new();
        let mut snapshots = Vec::with_capacity(lines.len());
        for line in lines {
            if line.quantity <= 0 {
                return Err(DomainError::validation("quantity", "must be positive"));
            }
            let product = state
                .products
                .iter()
                .find(|p| p.id == line.product_id)
                .ok_or(DomainError::NotFound {
                    entity: "Product",
                    key: line.product_id.to_string(),
                })?;
            let available = *remaining.entry(product.id).or_insert(product.quantity);
            if available < line.quantity {
                return Err(DomainError::InsufficientStock {
                    product: product.name.clone(),
                    requested: line.quantity,
                    available,
                });
            }
            remaining.insert(product.id, available - line.quantity);
            snapshots.push((product.name.clone(), product.selling_price));
        }

        // Commit: bill, items, stock decrements. Reborrow the guard so
        // field borrows stay disjoint inside the loop.
        let state = &mut *state;
        let now = Utc::now();
        let seq = state.bills.len() as u64 + 1;
        let bill_number = format_bill_number(now.date_naive(), seq);
        state.next_bill_id += 1;
        let bill_id = state.next_bill_id;

        let mut total_amount = 0.0;
        let mut items = Vec::with_capacity(lines.len());
        for (line, (product_name, price_per_unit)) in lines.iter().zip(snapshots) {
            let subtotal = price_per_unit * f64::from(line.quantity);
            total_amount += subtotal;
            state.next_item_id += 1;
            items.push(BillItem {
                id: state.next_item_id,
                bill_id,
                product_id: line.product_id,
                product_name,
                quantity: line.quantity,
                price_per_unit,
                subtotal,
            });
            if let Some(product) = state
                .products
                .iter_mut()
                .find(|p| p.id == line.product_id)
            {
                product.quantity -= line.quantity;
            }
        }

        let bill = Bill {
            id: bill_id,
            bill_number,
            total_amount,
            created_by,
            created_at: now,
        };
        state.bills.push(bill.clone());
        state.bill_items.extend(items.iter().cloned());

        Ok(BillWithItems { bill, items })
    }

    async fn get(&self, id: i64) -> Result<Option<BillWithItems>, DomainError> {
        let state = self.lock();
        Ok(state
            .bills
            .iter()
            .find(|b| b.id == id)
            .map(|b| Self::with_items(&state, b)))
    }

    async fn list(&self) -> Result<Vec<BillWithItems>, DomainError> {
        let state = self.lock();
        let mut bills: Vec<BillWithItems> = state
            .bills
            .iter()
            .map(|b| Self::with_items(&state, b))
            .collect();
        bills.sort_by(|a, b| b.bill.created_at.cmp(&a.bill.created_at));
        Ok(bills)
    }

    async fn list_by_creator(&self, user_id: i64) -> Result<Vec<BillWithItems>, DomainError> {
        let state = self.lock();
        let mut bills: Vec<BillWithItems> = state
            .bills
            .iter()
            .filter(|b| b.created_by == user_id)
            .map(|b| Self::with_items(&state, b))
            .collect();
        bills.sort_by(|a, b| b.bill.created_at.cmp(&a.bill.created_at));
        Ok(bills)
    }

    async fn delete(&self, id: i64) -> Result<(), DomainError> {
        let mut state = self.lock();
        let before = state.bills.len();
        state.bills.retain(|b| b.id != id);
        if state.bills.len() == before {
            return Err(DomainError::NotFound {
                entity: "Bill",
                key: id.to_string(),
            });
        }
        state.bill_items.retain(|i| i.bill_id != id);
        Ok(())
    }

    async fn daily_sales(&self, date: NaiveDate) -> Result<SalesSummary, DomainError> {
        let state = self.lock();
        let bills: Vec<&Bill> = state
            .bills
            .iter()
            .filter(|b| b.created_at.date_naive() == date)
            .collect();
        let total_sales = bills.iter().map(|b| b.total_amount).sum();
        let summaries = bills
            .iter()
            .map(|b| BillSummary {
                bill_number: b.bill_number.clone(),
                total_amount: b.total_amount,
                created_at: b.created_at,
                created_by: state
                    .users
                    .iter()
                    .find(|u| u.id == b.created_by)
                    .map_or_else(|| "unknown".to_string(), |u| u.full_name.clone()),
            })
            .collect();
        Ok(SalesSummary {
            date,
            total_bills: bills.len() as i64,
            total_sales,
            bills: summaries,
        })
    }

    async fn profit_loss(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<ProfitLossReport, DomainError> {
        let state = self.lock();
        let bills: Vec<&Bill> = state
            .bills
            .iter()
            .filter(|b| {
                let day = b.created_at.date_naive();
                day >= start && day <= end
            })
            .collect();
        let total_revenue: f64 = bills.iter().map(|b| b.total_amount).sum();
        let mut total_cost = 0.0;
        for bill in &bills {
            for item in state.bill_items.iter().filter(|i| i.bill_id == bill.id) {
                // Purchase price is read live; a deleted product costs nothing.
                if let Some(product) = state.products.iter().find(|p| p.id == item.product_id) {
                    total_cost += product.purchase_price * f64::from(item.quantity);
                }
            }
        }
        Ok(ProfitLossReport::from_totals(
            start,
            end,
            bills.len() as i64,
            total_revenue,
            total_cost,
        ))
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn list(&self) -> Result<Vec<User>, DomainError> {
        let state = self.lock();
        let mut users = state.users.clone();
        users.sort_by_key(|u| u.id);
        Ok(users)
    }

    async fn get(&self, id: i64) -> Result<Option<User>, DomainError> {
        let state = self.lock();
        Ok(state.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, DomainError> {
        let state = self.lock();
        Ok(state.users.iter().find(|u| u.username == username).cloned())
    }

    async fn insert(&self, new: NewUser) -> Result<User, DomainError> {
        let mut state = self.lock();
        if state.users.iter().any(|u| u.username == new.username) {
            return Err(DomainError::Duplicate {
                entity: "Username",
                value: new.username,
            });
        }
        if state.users.iter().any(|u| u.email == new.email) {
            return Err(DomainError::Duplicate {
                entity: "Email",
                value: new.email,
            });
        }
        state.next_user_id += 1;
        let user = User {
            id: state.next_user_id,
            username: new.username,
            password_hash: new.password_hash,
            full_name: new.full_name,
            email: new.email,
            role: new.role,
            is_active: true,
            created_at: Utc::now(),
        };
        state.users.push(user.clone());
        Ok(user)
    }

    async fn delete(&self, id: i64) -> Result<(), DomainError> {
        let mut state = self.lock();
        let before = state.users.len();
        state.users.retain(|u| u.id != id);
        if state.users.len() == before {
            return Err(DomainError::NotFound {
                entity: "User",
                key: id.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::Role;

    fn widget(store: &MemoryStore, quantity: i32) -> Product {
        store.seed_product(NewProduct {
            name: "Widget".to_string(),
            quantity,
            purchase_price: 6.0,
            selling_price: 10.0,
            category: None,
            supplier: None,
        })
    }

    fn cashier(store: &MemoryStore) -> User {
        store.seed_user(NewUser {
            username: "cashier".to_string(),
            password_hash: "hash".to_string(),
            full_name: "Cash Ier".to_string(),
            email: "cashier@example.com".to_string(),
            role: Role::User,
        })
    }

    #[tokio::test]
    async fn create_bill_decrements_stock_and_totals() {
        let store = MemoryStore::new();
        let product = widget(&store, 5);
        let user = cashier(&store);

        let bill = store
            .create(
                user.id,
                &[BillRequestLine {
                    product_id: product.id,
                    quantity: 3,
                }],
            )
            .await
            .expect("bill should be created");

        assert!((bill.bill.total_amount - 30.0).abs() < f64::EPSILON);
        assert_eq!(bill.items.len(), 1);
        assert!((bill.items[0].subtotal - 30.0).abs() < f64::EPSILON);
        assert_eq!(bill.items[0].product_name, "Widget");

        let after = ProductStore::get(&store, product.id)
            .await
            .expect("query")
            .expect("product exists");
        assert_eq!(after.quantity, 2);
    }

    #[tokio::test]
    async fn create_bill_total_is_sum_of_subtotals() {
        let store = MemoryStore::new();
        let widget = widget(&store, 10);
        let gadget = store.seed_product(NewProduct {
            name: "Gadget".to_string(),
            quantity: 10,
            purchase_price: 2.0,
            selling_price: 4.5,
            category: None,
            supplier: None,
        });
        let user = cashier(&store);

        let bill = store
            .create(
                user.id,
                &[
                    BillRequestLine {
                        product_id: widget.id,
                        quantity: 2,
                    },
                    BillRequestLine {
                        product_id: gadget.id,
                        quantity: 3,
                    },
                ],
            )
            .await
            .expect("bill should be created");

        let item_sum: f64 = bill.items.iter().map(|i| i.subtotal).sum();
        assert!((bill.bill.total_amount - item_sum).abs() < f64::EPSILON);
        for item in &bill.items {
            let expected = f64::from(item.quantity) * item.price_per_unit;
            assert!((item.subtotal - expected).abs() < f64::EPSILON);
        }
    }

    #[tokio::test]
    async fn insufficient_stock_fails_without_mutation() {
        let store = MemoryStore::new();
        let product = widget(&store, 2);
        let user = cashier(&store);

        let err = store
            .create(
                user.id,
                &[BillRequestLine {
                    product_id: product.id,
                    quantity: 6,
                }],
            )
            .await
            .unwrap_err();

        match err {
            DomainError::InsufficientStock {
                product, available, ..
            } => {
                assert_eq!(product, "Widget");
                assert_eq!(available, 2);
            }
            other => panic!("expected insufficient stock, got {other:?}"),
        }

        let after = ProductStore::get(&store, product.id)
            .await
            .expect("query")
            .expect("product exists");
        assert_eq!(after.quantity, 2);
        assert!(BillStore::list(&store).await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn failing_line_rolls_back_whole_bill() {
        let store = MemoryStore::new();
        let good = widget(&store, 10);
        let scarce = store.seed_product(NewProduct {
            name: "Scarce".to_string(),
            quantity: 1,
            purchase_price: 1.0,
            selling_price: 2.0,
            category: None,
            supplier: None,
        });
        let user = cashier(&store);

        let result = store
            .create(
                user.id,
                &[
                    BillRequestLine {
                        product_id: good.id,
                        quantity: 2,
                    },
                    BillRequestLine {
                        product_id: scarce.id,
                        quantity: 5,
                    },
                ],
            )
            .await;
        assert!(result.is_err());

        // Nothing changed, including the already-validated first line.
        let good_after = ProductStore::get(&store, good.id)
            .await
            .expect("query")
            .expect("exists");
        assert_eq!(good_after.quantity, 10);
        assert!(BillStore::list(&store).await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn repeated_line_cannot_drive_stock_negative() {
        let store = MemoryStore::new();
        let product = widget(&store, 5);
        let user = cashier(&store);

        let result = store
            .create(
                user.id,
                &[
                    BillRequestLine {
                        product_id: product.id,
                        quantity: 3,
                    },
                    BillRequestLine {
                        product_id: product.id,
                        quantity: 3,
                    },
                ],
            )
            .await;
        assert!(matches!(
            result,
            Err(DomainError::InsufficientStock { .. })
        ));

        let after = ProductStore::get(&store, product.id)
            .await
            .expect("query")
            .expect("exists");
        assert_eq!(after.quantity, 5);
    }

    #[tokio::test]
    async fn bill_numbers_are_sequential_and_dated() {
        let store = MemoryStore::new();
        let product = widget(&store, 100);
        let user = cashier(&store);
        let line = [BillRequestLine {
            product_id: product.id,
            quantity: 1,
        }];

        let first = store.create(user.id, &line).await.expect("first bill");
        let second = store.create(user.id, &line).await.expect("second bill");

        let today = Utc::now().date_naive();
        assert_eq!(first.bill.bill_number, format_bill_number(today, 1));
        assert_eq!(second.bill.bill_number, format_bill_number(today, 2));
    }

    #[tokio::test]
    async fn insert_product_rejects_case_insensitive_duplicate() {
        let store = MemoryStore::new();
        widget(&store, 5);

        let err = ProductStore::insert(
            &store,
            NewProduct {
                name: "WIDGET".to_string(),
                quantity: 1,
                purchase_price: 1.0,
                selling_price: 2.0,
                category: None,
                supplier: None,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, DomainError::Duplicate { .. }));
    }

    #[tokio::test]
    async fn set_quantity_replaces_outright() {
        let store = MemoryStore::new();
        let product = widget(&store, 5);

        let updated = store
            .set_quantity(product.id, 42)
            .await
            .expect("should update");
        assert_eq!(updated.quantity, 42);

        let err = store.set_quantity(product.id, -1).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation { .. }));
    }

    #[tokio::test]
    async fn low_stock_is_strictly_below_threshold() {
        let store = MemoryStore::new();
        widget(&store, 9);
        store.seed_product(NewProduct {
            name: "Plenty".to_string(),
            quantity: 10,
            purchase_price: 1.0,
            selling_price: 2.0,
            category: None,
            supplier: None,
        });

        let low = store.low_stock(10).await.expect("query");
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].name, "Widget");
    }

    #[tokio::test]
    async fn read_only_queries_are_idempotent() {
        let store = MemoryStore::new();
        widget(&store, 5);

        let first = ProductStore::list(&store).await.expect("list");
        let second = ProductStore::list(&store).await.expect("list");
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn daily_sales_counts_only_the_day() {
        let store = MemoryStore::new();
        let product = widget(&store, 100);
        let user = cashier(&store);
        let line = [BillRequestLine {
            product_id: product.id,
            quantity: 2,
        }];
        store.create(user.id, &line).await.expect("bill");
        store.create(user.id, &line).await.expect("bill");

        let today = Utc::now().date_naive();
        let summary = store.daily_sales(today).await.expect("summary");
        assert_eq!(summary.total_bills, 2);
        assert!((summary.total_sales - 40.0).abs() < f64::EPSILON);
        assert_eq!(summary.bills[0].created_by, "Cash Ier");

        let yesterday = today.pred_opt().expect("valid date");
        let empty = store.daily_sales(yesterday).await.expect("summary");
        assert_eq!(empty.total_bills, 0);
        assert_eq!(empty.total_sales, 0.0);
    }

    #[tokio::test]
    async fn profit_loss_uses_live_purchase_price() {
        let store = MemoryStore::new();
        let product = widget(&store, 10);
        let user = cashier(&store);
        store
            .create(
                user.id,
                &[BillRequestLine {
                    product_id: product.id,
                    quantity: 2,
                }],
            )
            .await
            .expect("bill");

        // Purchase price changes after the sale; cost is read live.
        store
            .update(
                product.id,
                ProductUpdate {
                    purchase_price: Some(8.0),
                    ..ProductUpdate::default()
                },
            )
            .await
            .expect("update");

        let today = Utc::now().date_naive();
        let report = store.profit_loss(today, today).await.expect("report");
        assert!((report.total_revenue - 20.0).abs() < f64::EPSILON);
        assert!((report.total_cost - 16.0).abs() < f64::EPSILON);
        assert!((report.profit - 4.0).abs() < f64::EPSILON);
        assert!((report.profit_margin - 20.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn duplicate_username_and_email_rejected() {
        let store = MemoryStore::new();
        cashier(&store);

        let dup_username = UserStore::insert(
            &store,
            NewUser {
                username: "cashier".to_string(),
                password_hash: "h".to_string(),
                full_name: "Other".to_string(),
                email: "other@example.com".to_string(),
                role: Role::User,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(dup_username, DomainError::Duplicate { .. }));

        let dup_email = UserStore::insert(
            &store,
            NewUser {
                username: "other".to_string(),
                password_hash: "h".to_string(),
                full_name: "Other".to_string(),
                email: "cashier@example.com".to_string(),
                role: Role::User,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(dup_email, DomainError::Duplicate { .. }));
    }

    #[tokio::test]
    async fn delete_missing_user_is_not_found() {
        let store = MemoryStore::new();
        let err = UserStore::delete(&store, 99).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }
}
