//! Database rows to API models.

use chrono::{DateTime, NaiveDateTime, Utc};

use messagely_db::models::{
    CorrespondenceRow, MessageDetailRow, MessageRow, ProfileRow, ReadReceiptRow, UserRow,
};
use messagely_types::models::{
    InboxMessage, MessageDetail, OutboxMessage, ReadReceipt, SentMessage, UserDetail, UserSummary,
};

use crate::error::ApiError;

/// Parse a stored timestamp. A value that does not parse is corrupt data and
/// fails the request rather than being shown as some other time.
pub(crate) fn timestamp(raw: &str) -> Result<DateTime<Utc>, ApiError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // SQLite's datetime('now') form, in case rows were written by hand.
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .map_err(|e| ApiError::Internal(format!("corrupt timestamp '{raw}': {e}")))
}

fn optional_timestamp(raw: Option<&str>) -> Result<Option<DateTime<Utc>>, ApiError> {
    raw.map(timestamp).transpose()
}

pub(crate) fn summary(row: ProfileRow) -> UserSummary {
    UserSummary {
        username: row.username,
        first_name: row.first_name,
        last_name: row.last_name,
        phone: row.phone,
    }
}

pub(crate) fn user_detail(row: UserRow) -> Result<UserDetail, ApiError> {
    Ok(UserDetail {
        join_at: timestamp(&row.join_at)?,
        last_login_at: optional_timestamp(row.last_login_at.as_deref())?,
        username: row.username,
        first_name: row.first_name,
        last_name: row.last_name,
        phone: row.phone,
    })
}

pub(crate) fn inbox_message(row: CorrespondenceRow) -> Result<InboxMessage, ApiError> {
    Ok(InboxMessage {
        id: row.id,
        sent_at: timestamp(&row.sent_at)?,
        read_at: optional_timestamp(row.read_at.as_deref())?,
        body: row.body,
        from_user: summary(row.counterpart),
    })
}

pub(crate) fn outbox_message(row: CorrespondenceRow) -> Result<OutboxMessage, ApiError> {
    Ok(OutboxMessage {
        id: row.id,
        sent_at: timestamp(&row.sent_at)?,
        read_at: optional_timestamp(row.read_at.as_deref())?,
        body: row.body,
        to_user: summary(row.counterpart),
    })
}

pub(crate) fn message_detail(row: MessageDetailRow) -> Result<MessageDetail, ApiError> {
    Ok(MessageDetail {
        id: row.id,
        sent_at: timestamp(&row.sent_at)?,
        read_at: optional_timestamp(row.read_at.as_deref())?,
        body: row.body,
        from_user: summary(row.from_user),
        to_user: summary(row.to_user),
    })
}

pub(crate) fn sent_message(row: MessageRow) -> Result<SentMessage, ApiError> {
    Ok(SentMessage {
        id: row.id,
        sent_at: timestamp(&row.sent_at)?,
        from_username: row.from_username,
        to_username: row.to_username,
        body: row.body,
    })
}

pub(crate) fn read_receipt(row: ReadReceiptRow) -> Result<ReadReceipt, ApiError> {
    Ok(ReadReceipt {
        id: row.id,
        read_at: timestamp(&row.read_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn parses_stored_and_legacy_forms() {
        let a = timestamp("2024-03-01T12:30:45.123456Z").unwrap();
        assert_eq!((a.year(), a.month(), a.day(), a.hour()), (2024, 3, 1, 12));

        let b = timestamp("2024-03-01 12:30:45").unwrap();
        assert_eq!((b.minute(), b.second()), (30, 45));
    }

    #[test]
    fn corrupt_timestamp_is_an_internal_error() {
        assert!(matches!(timestamp("yesterday"), Err(ApiError::Internal(_))));

        let row = ReadReceiptRow {
            id: 7,
            read_at: "not a time".to_string(),
        };
        assert!(matches!(read_receipt(row), Err(ApiError::Internal(_))));
    }

    #[test]
    fn missing_optional_timestamp_stays_missing() {
        assert_eq!(optional_timestamp(None).unwrap(), None);
        assert!(optional_timestamp(Some("garbage")).is_err());
    }
}
