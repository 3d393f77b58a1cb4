use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

fn big_pk(col: impl IntoIden) -> ColumnDef {
    ColumnDef::new(col)
        .big_integer()
        .not_null()
        .auto_increment()
        .primary_key()
        .to_owned()
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Stra::Table)
                    .if_not_exists()
                    .col(big_pk(Stra::Id))
                    .col(string(Stra::Name))
                    .col(string(Stra::Converge).default("[0,0]").to_owned())
                    .col(integer(Stra::RecoveryNotify).default(0).to_owned())
                    .col(string(Stra::Callback).default("").to_owned())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Maskconf::Table)
                    .if_not_exists()
                    .col(big_pk(Maskconf::Id))
                    .col(text(Maskconf::Endpoints))
                    .col(string(Maskconf::Metric))
                    .col(text(Maskconf::Tags))
                    .col(big_integer(Maskconf::Btime))
                    .col(big_integer(Maskconf::Etime))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(User::Table)
                    .if_not_exists()
                    .col(big_pk(User::Id))
                    .col(string(User::Username).unique_key().to_owned())
                    .col(string(User::Phone).default("").to_owned())
                    .col(string(User::Email).default("").to_owned())
                    .col(string(User::Im).default("").to_owned())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(TeamUser::Table)
                    .if_not_exists()
                    .col(big_pk(TeamUser::Id))
                    .col(big_integer(TeamUser::TeamId))
                    .col(big_integer(TeamUser::UserId))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_team_user_unique")
                    .table(TeamUser::Table)
                    .col(TeamUser::TeamId)
                    .col(TeamUser::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(EndpointBinding::Table)
                    .if_not_exists()
                    .col(big_pk(EndpointBinding::Id))
                    .col(string(EndpointBinding::Endpoint))
                    .col(string(EndpointBinding::NodePath))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_endpoint_binding_endpoint")
                    .table(EndpointBinding::Table)
                    .col(EndpointBinding::Endpoint)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for table in [
            EndpointBinding::Table.into_iden(),
            TeamUser::Table.into_iden(),
            User::Table.into_iden(),
            Maskconf::Table.into_iden(),
            Stra::Table.into_iden(),
        ] {
            manager
                .drop_table(Table::drop().table(table).to_owned())
                .await?;
        }
        Ok(())
    }
}

#[derive(Iden)]
enum Stra {
    Table,
    Id,
    Name,
    Converge,
    RecoveryNotify,
    Callback,
}

#[derive(Iden)]
enum Maskconf {
    Table,
    Id,
    Endpoints,
    Metric,
    Tags,
    Btime,
    Etime,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
    Username,
    Phone,
    Email,
    Im,
}

#[derive(Iden)]
enum TeamUser {
    Table,
    Id,
    TeamId,
    UserId,
}

#[derive(Iden)]
enum EndpointBinding {
    Table,
    Id,
    Endpoint,
    NodePath,
}
