use crate::entities::prelude::*;
use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::Schema;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let backend = manager.get_database_backend();
        let schema = Schema::new(backend);

        manager
            .create_table(
                schema
                    .create_table_from_entity(Users)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(Tokens)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        for mut index in schema.create_index_from_entity(Tokens) {
            manager.create_index(index.if_not_exists().to_owned()).await?;
        }

        manager
            .create_table(
                schema
                    .create_table_from_entity(Permissions)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(UsersPermissions)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(Movies)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(Ratings)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Ratings).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Movies).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(UsersPermissions).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Permissions).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Tokens).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users).to_owned())
            .await?;

        Ok(())
    }
}
