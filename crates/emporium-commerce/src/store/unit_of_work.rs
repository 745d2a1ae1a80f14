//! The unit of work.

use futures::future::BoxFuture;
use std::sync::Arc;

use crate::store::{Reader, Repositories, Store};
use crate::CommerceError;

tokio::task_local! {
    static IN_UNIT_OF_WORK: ();
}

/// Runs operations atomically against a [`Store`].
///
/// ```rust,ignore
/// let order_id = uow
///     .execute(move |repos| {
///         Box::pin(async move {
///             let order = repos.orders().find_by_id(id).await?;
///             Ok(order.map(|o| o.id))
///         })
///     })
///     .await?;
/// ```
#[derive(Clone)]
pub struct UnitOfWork {
    store: Arc<dyn Store>,
}

impl UnitOfWork {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Run `operation` inside one transaction.
    ///
    /// Commits when it returns `Ok`, rolls back otherwise, and hands the
    /// result back unchanged. Writes are invisible to readers until commit.
    /// Calling `execute` again from inside `operation` fails with
    /// [`CommerceError::NestedUnitOfWork`].
    pub async fn execute<T, F>(&self, operation: F) -> Result<T, CommerceError>
    where
        T: Send,
        F: for<'s> FnOnce(&'s mut dyn Repositories) -> BoxFuture<'s, Result<T, CommerceError>>
            + Send,
    {
        if IN_UNIT_OF_WORK.try_with(|_| ()).is_ok() {
            return Err(CommerceError::NestedUnitOfWork);
        }

        IN_UNIT_OF_WORK
            .scope((), async move {
                let mut scope = self.store.begin().await?;
                let result = operation(scope.repos()).await;

                match result {
                    Ok(value) => {
                        scope.commit().await?;
                        tracing::debug!("unit of work committed");
                        Ok(value)
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "unit of work rolled back");
                        if let Err(rollback_err) = scope.rollback().await {
                            tracing::error!(error = %rollback_err, "rollback failed");
                        }
                        Err(err)
                    }
                }
            })
            .await
    }

    /// Non-transactional reads.
    pub fn reader(&self) -> &dyn Reader {
        self.store.reader()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::NewProduct;
    use crate::ids::ProductId;
    use crate::money::{Currency, Money};
    use crate::store::MemoryStore;
    use chrono::Utc;

    fn product() -> crate::catalog::Product {
        NewProduct {
            sku: "PEN-01".into(),
            name: "Pen".into(),
            description: None,
            category_id: None,
            price: Money::new(150, Currency::USD),
            quantity: 10,
        }
        .into_product(Utc::now())
    }

    #[tokio::test]
    async fn test_commit_publishes_writes() {
        let store = Arc::new(MemoryStore::new());
        let uow = UnitOfWork::new(store.clone());
        let product = product();
        let id = product.id;

        uow.execute(move |repos| {
            Box::pin(async move { repos.products().insert(&product).await })
        })
        .await
        .unwrap();

        assert!(uow.reader().product(id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_error_rolls_back_and_propagates() {
        let store = Arc::new(MemoryStore::new());
        let uow = UnitOfWork::new(store.clone());
        let product = product();
        let id = product.id;

        let err = uow
            .execute(move |repos| {
                Box::pin(async move {
                    repos.products().insert(&product).await?;
                    Err::<(), _>(CommerceError::CartIsEmpty)
                })
            })
            .await
            .unwrap_err();

        assert!(matches!(err, CommerceError::CartIsEmpty));
        assert!(uow.reader().product(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_uncommitted_writes_invisible_to_reader() {
        let store = Arc::new(MemoryStore::new());
        let uow = UnitOfWork::new(store.clone());
        let product = product();
        let id = product.id;
        let reader_store = store.clone();

        let seen_inside = uow
            .execute(move |repos| {
                Box::pin(async move {
                    repos.products().insert(&product).await?;
                    reader_store.reader().product(id).await
                })
            })
            .await
            .unwrap();

        assert!(seen_inside.is_none());
    }

    #[tokio::test]
    async fn test_nested_execute_rejected() {
        let store = Arc::new(MemoryStore::new());
        let uow = UnitOfWork::new(store);
        let inner = uow.clone();

        let err = uow
            .execute(move |_repos| {
                Box::pin(async move {
                    inner
                        .execute(|repos| {
                            Box::pin(async move {
                                repos.products().find_by_id(ProductId::generate()).await
                            })
                        })
                        .await
                })
            })
            .await
            .unwrap_err();

        assert!(matches!(err, CommerceError::NestedUnitOfWork));
    }
}
