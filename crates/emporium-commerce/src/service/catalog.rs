//! Catalog administration.

use crate::auth::Actor;
use crate::catalog::{
    Category, CategoryPatch, NewCategory, NewProduct, Product, ProductFilter, ProductPatch,
    StockLedger,
};
use crate::ids::{CategoryId, ProductId};
use crate::service::ServiceContext;
use crate::store::Repositories;
use crate::CommerceError;

/// A product may only point at a live category.
async fn require_category(
    repos: &mut dyn Repositories,
    category_id: Option<CategoryId>,
) -> Result<(), CommerceError> {
    if let Some(id) = category_id {
        repos
            .categories()
            .find_by_id(id)
            .await?
            .ok_or(CommerceError::CategoryNotFound(id))?;
    }
    Ok(())
}

/// Category and product CRUD, plus restocking.
#[derive(Clone)]
pub struct CatalogService {
    ctx: ServiceContext,
}

impl CatalogService {
    pub(crate) fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    #[tracing::instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_category(
        &self,
        actor: &Actor,
        input: NewCategory,
    ) -> Result<Category, CommerceError> {
        actor.require_staff("creating categories")?;
        input.validate()?;

        let category = input.into_category(self.ctx.clock.now());
        let row = category.clone();
        self.ctx
            .uow
            .execute(move |repos| Box::pin(async move { repos.categories().insert(&row).await }))
            .await?;

        tracing::info!(category_id = %category.id, "category created");
        Ok(category)
    }

    #[tracing::instrument(skip(self, patch))]
    pub async fn update_category(
        &self,
        actor: &Actor,
        category_id: CategoryId,
        patch: CategoryPatch,
    ) -> Result<Category, CommerceError> {
        actor.require_staff("updating categories")?;
        patch.validate()?;

        let now = self.ctx.clock.now();
        self.ctx
            .uow
            .execute(move |repos| {
                Box::pin(async move {
                    let mut category = repos
                        .categories()
                        .find_by_id(category_id)
                        .await?
                        .ok_or(CommerceError::CategoryNotFound(category_id))?;
                    patch.apply(&mut category, now);
                    repos.categories().update(&category).await?;
                    Ok(category)
                })
            })
            .await
    }

    /// Soft-delete a category. Products already in it keep the reference.
    #[tracing::instrument(skip(self))]
    pub async fn delete_category(
        &self,
        actor: &Actor,
        category_id: CategoryId,
    ) -> Result<(), CommerceError> {
        actor.require_staff("deleting categories")?;

        let now = self.ctx.clock.now();
        let deleted = self
            .ctx
            .uow
            .execute(move |repos| {
                Box::pin(async move { repos.categories().soft_delete(category_id, now).await })
            })
            .await?;

        if !deleted {
            return Err(CommerceError::CategoryNotFound(category_id));
        }
        tracing::info!(%category_id, "category deleted");
        Ok(())
    }

    pub async fn category(&self, category_id: CategoryId) -> Result<Category, CommerceError> {
        self.ctx
            .uow
            .reader()
            .category(category_id)
            .await?
            .ok_or(CommerceError::CategoryNotFound(category_id))
    }

    pub async fn categories(&self) -> Result<Vec<Category>, CommerceError> {
        self.ctx.uow.reader().categories().await
    }

    #[tracing::instrument(skip(self, input), fields(sku = %input.sku))]
    pub async fn create_product(
        &self,
        actor: &Actor,
        input: NewProduct,
    ) -> Result<Product, CommerceError> {
        actor.require_staff("creating products")?;
        input.validate(self.ctx.config.currency)?;

        let product = input.into_product(self.ctx.clock.now());
        let row = product.clone();
        self.ctx
            .uow
            .execute(move |repos| {
                Box::pin(async move {
                    require_category(repos, row.category_id).await?;
                    repos.products().insert(&row).await
                })
            })
            .await?;

        tracing::info!(product_id = %product.id, "product created");
        Ok(product)
    }

    #[tracing::instrument(skip(self, patch))]
    pub async fn update_product(
        &self,
        actor: &Actor,
        product_id: ProductId,
        patch: ProductPatch,
    ) -> Result<Product, CommerceError> {
        actor.require_staff("updating products")?;
        patch.validate(self.ctx.config.currency)?;

        let now = self.ctx.clock.now();
        self.ctx
            .uow
            .execute(move |repos| {
                Box::pin(async move {
                    require_category(repos, patch.category_id).await?;
                    let mut product = repos
                        .products()
                        .find_for_update(product_id)
                        .await?
                        .ok_or(CommerceError::ProductNotFound(product_id))?;
                    patch.apply(&mut product, now);
                    repos.products().update(&product).await?;
                    Ok(product)
                })
            })
            .await
    }

    /// Add stock. Returns the new quantity.
    #[tracing::instrument(skip(self))]
    pub async fn restock(
        &self,
        actor: &Actor,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<i64, CommerceError> {
        actor.require_staff("restocking")?;

        let now = self.ctx.clock.now();
        let updated = self
            .ctx
            .uow
            .execute(move |repos| {
                Box::pin(async move {
                    StockLedger::release(repos.products(), product_id, quantity, now).await
                })
            })
            .await?;

        tracing::info!(%product_id, quantity, updated, "product restocked");
        Ok(updated)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_product(
        &self,
        actor: &Actor,
        product_id: ProductId,
    ) -> Result<(), CommerceError> {
        actor.require_staff("deleting products")?;

        let now = self.ctx.clock.now();
        let deleted = self
            .ctx
            .uow
            .execute(move |repos| {
                Box::pin(async move { repos.products().soft_delete(product_id, now).await })
            })
            .await?;

        if !deleted {
            return Err(CommerceError::ProductNotFound(product_id));
        }
        tracing::info!(%product_id, "product deleted");
        Ok(())
    }

    pub async fn product(&self, product_id: ProductId) -> Result<Product, CommerceError> {
        self.ctx
            .uow
            .reader()
            .product(product_id)
            .await?
            .ok_or(CommerceError::ProductNotFound(product_id))
    }

    pub async fn products(&self, filter: &ProductFilter) -> Result<Vec<Product>, CommerceError> {
        self.ctx.uow.reader().products(filter).await
    }
}
