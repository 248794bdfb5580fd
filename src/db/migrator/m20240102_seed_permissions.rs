use crate::entities::{permissions, prelude::*};
use crate::services::permissions::Permission;
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let mut insert = Query::insert()
            .into_table(Permissions)
            .columns([permissions::Column::Code])
            .to_owned();

        for permission in Permission::ALL {
            insert.values_panic([permission.code().into()]);
        }

        insert.on_conflict(
            OnConflict::column(permissions::Column::Code)
                .do_nothing()
                .to_owned(),
        );

        manager.exec_stmt(insert).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let delete = Query::delete().from_table(Permissions).to_owned();
        manager.exec_stmt(delete).await?;

        Ok(())
    }
}
