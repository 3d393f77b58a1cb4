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
                    .table(Event::Table)
                    .if_not_exists()
                    .col(big_pk(Event::Id))
                    .col(big_integer(Event::Sid))
                    .col(string(Event::Sname))
                    .col(string(Event::Endpoint))
                    .col(string(Event::EndpointAlias).default("").to_owned())
                    .col(integer(Event::Priority))
                    .col(string(Event::EventType))
                    .col(big_integer(Event::Hashid))
                    .col(big_integer(Event::Etime))
                    .col(string(Event::Value).default("").to_owned())
                    .col(text(Event::Info))
                    .col(text(Event::Detail))
                    .col(text(Event::Users))
                    .col(text(Event::Groups))
                    .col(integer(Event::NeedUpgrade).default(0).to_owned())
                    .col(text(Event::AlertUpgrade))
                    .col(string(Event::Status).default("").to_owned())
                    .to_owned(),
            )
            .await?;

        // event_count scans by strategy, identity and time range
        manager
            .create_index(
                Index::create()
                    .name("idx_event_sid_hashid_etime")
                    .table(Event::Table)
                    .col(Event::Sid)
                    .col(Event::Hashid)
                    .col(Event::Etime)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(EventCur::Table)
                    .if_not_exists()
                    .col(big_pk(EventCur::Id))
                    .col(big_integer(EventCur::Hashid).unique_key().to_owned())
                    .col(big_integer(EventCur::Sid))
                    .col(string(EventCur::Endpoint))
                    .col(integer(EventCur::Priority))
                    .col(text(EventCur::Claimants))
                    .col(integer(EventCur::IgnoreAlert).default(0).to_owned())
                    .col(string(EventCur::Status).default("").to_owned())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Marker::Table)
                    .if_not_exists()
                    .col(string(Marker::Key).primary_key().to_owned())
                    .col(big_integer(Marker::Value))
                    .col(big_integer(Marker::ExpiresAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(QueueMessage::Table)
                    .if_not_exists()
                    .col(big_pk(QueueMessage::Id))
                    .col(string(QueueMessage::Queue))
                    .col(text(QueueMessage::Payload))
                    .col(big_integer(QueueMessage::CreatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_queue_message_queue")
                    .table(QueueMessage::Table)
                    .col(QueueMessage::Queue)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(QueueMessage::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Marker::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(EventCur::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Event::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Event {
    Table,
    Id,
    Sid,
    Sname,
    Endpoint,
    EndpointAlias,
    Priority,
    EventType,
    Hashid,
    Etime,
    Value,
    Info,
    Detail,
    Users,
    Groups,
    NeedUpgrade,
    AlertUpgrade,
    Status,
}

#[derive(Iden)]
enum EventCur {
    Table,
    Id,
    Hashid,
    Sid,
    Endpoint,
    Priority,
    Claimants,
    IgnoreAlert,
    Status,
}

#[derive(Iden)]
enum Marker {
    Table,
    Key,
    Value,
    ExpiresAt,
}

#[derive(Iden)]
enum QueueMessage {
    Table,
    Id,
    Queue,
    Payload,
    CreatedAt,
}
