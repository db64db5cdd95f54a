use std::collections::HashSet;
use std::str::FromStr;

use anyhow::{Result, anyhow};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};

use sahyog_types::api::{CreateDonationRequest, CreateNgoRequest, PlatformStats, SendMessageRequest};
use sahyog_types::models::{Donation, DonationStatus, DonationUpdate, Message, Ngo, Role, User};

use crate::Database;
use crate::models::UserRow;

const USER_COLUMNS: &str = "id, name, email, password, role, created_at";

const NGO_COLUMNS: &str = "id, user_id, organization_name, description, mission, location, verified, \
     impact_score, focus_areas, registration_number, website, phone, created_at";

const DONATION_COLUMNS: &str = "id, donor_id, ngo_id, title, description, type, quantity, amount, \
     status, urgency, pickup_address, pickup_time, estimated_impact, actual_impact, created_at, updated_at";

const MESSAGE_COLUMNS: &str =
    "id, sender_id, receiver_id, donation_id, content, message_type, read, created_at";

const UPDATE_COLUMNS: &str = "id, donation_id, status, message, updated_by, created_at";

/// A conditional status change: applied only while the donation is still in
/// `from`. `ngo_id` and `actual_impact` overwrite the stored value when set.
#[derive(Debug, Clone)]
pub struct Transition<'a> {
    pub donation_id: i64,
    pub from: DonationStatus,
    pub to: DonationStatus,
    pub ngo_id: Option<i64>,
    pub actual_impact: Option<i64>,
    pub updated_by: i64,
    pub note: Option<&'a str>,
}

impl Database {
    // -- Users --

    /// Returns `None` when the email is already registered.
    pub fn create_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<Option<User>> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT INTO users (name, email, password, role, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![name, email, password_hash, role.as_str(), timestamp_text(Utc::now())],
            );
            match inserted {
                Ok(_) => {
                    let id = conn.last_insert_rowid();
                    let row = query_user(conn, "id = ?1", [id])?
                        .ok_or_else(|| anyhow!("user {} missing after insert", id))?;
                    Ok(Some(row.into_user()))
                }
                Err(e) if is_unique_violation(&e) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email = ?1", [email]))
    }

    pub fn get_user(&self, id: i64) -> Result<Option<User>> {
        self.with_conn(|conn| Ok(query_user(conn, "id = ?1", [id])?.map(UserRow::into_user)))
    }

    // -- NGOs --

    /// Returns `None` when the user already owns an NGO profile.
    pub fn create_ngo(&self, user_id: i64, req: &CreateNgoRequest) -> Result<Option<Ngo>> {
        let focus_areas = serde_json::to_string(&req.focus_areas)?;

        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT INTO ngos (user_id, organization_name, description, mission, location, focus_areas,
                                   registration_number, website, phone, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    user_id,
                    req.organization_name.trim(),
                    req.description,
                    req.mission,
                    req.location.trim(),
                    focus_areas,
                    req.registration_number,
                    req.website,
                    req.phone,
                    timestamp_text(Utc::now()),
                ],
            );
            match inserted {
                Ok(_) => {
                    let id = conn.last_insert_rowid();
                    let ngo = query_ngo(conn, id)?.ok_or_else(|| anyhow!("ngo {} missing after insert", id))?;
                    Ok(Some(ngo))
                }
                Err(e) if is_unique_violation(&e) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn get_ngo_by_user(&self, user_id: i64) -> Result<Option<Ngo>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {NGO_COLUMNS} FROM ngos WHERE user_id = ?1");
            Ok(conn.query_row(&sql, [user_id], ngo_from_row).optional()?)
        })
    }

    /// Verified (`true`) or awaiting verification (`false`), oldest first.
    pub fn list_ngos(&self, verified: bool) -> Result<Vec<Ngo>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {NGO_COLUMNS} FROM ngos WHERE verified = ?1 ORDER BY id");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([verified], ngo_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn set_ngo_verified(&self, id: i64, verified: bool) -> Result<Option<Ngo>> {
        self.with_conn(|conn| {
            let changed = conn.execute("UPDATE ngos SET verified = ?1 WHERE id = ?2", params![verified, id])?;
            if changed == 0 {
                return Ok(None);
            }
            query_ngo(conn, id)
        })
    }

    // -- Donations --

    /// Inserts a `pending` donation and its first audit record in one transaction.
    pub fn create_donation(&self, donor_id: i64, req: &CreateDonationRequest) -> Result<Donation> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let now = timestamp_text(Utc::now());

            tx.execute(
                "INSERT INTO donations (donor_id, title, description, type, quantity, amount, status, urgency,
                                        pickup_address, pickup_time, estimated_impact, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)",
                params![
                    donor_id,
                    req.title.trim(),
                    req.description,
                    req.donation_type.as_str(),
                    req.quantity.trim(),
                    req.amount,
                    DonationStatus::Pending.as_str(),
                    req.urgency.as_str(),
                    req.pickup_address.trim(),
                    req.pickup_time,
                    req.estimated_impact,
                    now,
                ],
            )?;
            let id = tx.last_insert_rowid();

            insert_update(&tx, id, DonationStatus::Pending, Some("Donation created"), donor_id, &now)?;

            let donation = query_donation(&tx, id)?.ok_or_else(|| anyhow!("donation {} missing after insert", id))?;
            tx.commit()?;
            Ok(donation)
        })
    }

    pub fn get_donation(&self, id: i64) -> Result<Option<Donation>> {
        self.with_conn(|conn| query_donation(conn, id))
    }

    pub fn list_donations_by_donor(&self, donor_id: i64) -> Result<Vec<Donation>> {
        self.with_conn(|conn| query_donations(conn, "donor_id = ?1", [donor_id]))
    }

    pub fn list_donations_by_ngo(&self, ngo_id: i64) -> Result<Vec<Donation>> {
        self.with_conn(|conn| query_donations(conn, "ngo_id = ?1", [ngo_id]))
    }

    pub fn list_donations_by_status(&self, status: DonationStatus) -> Result<Vec<Donation>> {
        self.with_conn(|conn| query_donations(conn, "status = ?1", [status.as_str()]))
    }

    /// Check-and-set on the donation's status, plus the audit record, in one
    /// transaction. Returns `None` when the donation is missing or no longer
    /// in `transition.from`.
    pub fn transition_donation(&self, transition: &Transition<'_>) -> Result<Option<Donation>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let now = timestamp_text(Utc::now());

            let changed = tx.execute(
                "UPDATE donations
                 SET status = ?1,
                     ngo_id = COALESCE(?2, ngo_id),
                     actual_impact = COALESCE(?3, actual_impact),
                     updated_at = ?4
                 WHERE id = ?5 AND status = ?6",
                params![
                    transition.to.as_str(),
                    transition.ngo_id,
                    transition.actual_impact,
                    now,
                    transition.donation_id,
                    transition.from.as_str(),
                ],
            )?;
            if changed == 0 {
                return Ok(None);
            }

            insert_update(
                &tx,
                transition.donation_id,
                transition.to,
                transition.note,
                transition.updated_by,
                &now,
            )?;

            let donation = query_donation(&tx, transition.donation_id)?
                .ok_or_else(|| anyhow!("donation {} missing after update", transition.donation_id))?;
            tx.commit()?;
            Ok(Some(donation))
        })
    }

    /// Audit trail for a donation, oldest first.
    pub fn get_donation_updates(&self, donation_id: i64) -> Result<Vec<DonationUpdate>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {UPDATE_COLUMNS} FROM donation_updates WHERE donation_id = ?1 ORDER BY created_at, id"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([donation_id], update_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Analytics --

    pub fn platform_stats(&self) -> Result<PlatformStats> {
        self.with_conn(|conn| {
            let (total_donations, total_value, lives_impacted) = conn.query_row(
                "SELECT COUNT(*), COALESCE(SUM(amount), 0.0), COALESCE(SUM(estimated_impact), 0)
                 FROM donations WHERE status = ?1",
                [DonationStatus::Pending.as_str()],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, f64>(1)?, row.get::<_, i64>(2)?)),
            )?;
            let verified_ngos: i64 =
                conn.query_row("SELECT COUNT(*) FROM ngos WHERE verified = 1", [], |row| row.get(0))?;

            Ok(PlatformStats {
                total_donations: total_donations as usize,
                verified_ngos: verified_ngos as usize,
                total_value,
                lives_impacted,
            })
        })
    }

    // -- Messages --

    pub fn insert_message(&self, sender_id: i64, req: &SendMessageRequest) -> Result<Message> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (sender_id, receiver_id, donation_id, content, message_type, read, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)",
                params![
                    sender_id,
                    req.receiver_id,
                    req.donation_id,
                    req.content,
                    req.message_type.as_str(),
                    timestamp_text(Utc::now()),
                ],
            )?;
            let id = conn.last_insert_rowid();
            query_message(conn, id)?.ok_or_else(|| anyhow!("message {} missing after insert", id))
        })
    }

    pub fn get_message(&self, id: i64) -> Result<Option<Message>> {
        self.with_conn(|conn| query_message(conn, id))
    }

    /// Every message between the two users, oldest first.
    pub fn get_conversation(&self, user_a: i64, user_b: i64) -> Result<Vec<Message>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages
                 WHERE (sender_id = ?1 AND receiver_id = ?2) OR (sender_id = ?2 AND receiver_id = ?1)
                 ORDER BY created_at ASC, id ASC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_a, user_b], message_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Latest message per correspondent, most recent conversation first.
    pub fn get_conversation_summaries(&self, user_id: i64) -> Result<Vec<Message>> {
        let all = self.with_conn(|conn| {
            let sql = format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages
                 WHERE sender_id = ?1 OR receiver_id = ?1
                 ORDER BY created_at DESC, id DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], message_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })?;

        let mut seen = HashSet::new();
        Ok(all
            .into_iter()
            .filter(|m| seen.insert(m.correspondent_of(user_id)))
            .collect())
    }

    pub fn mark_message_read(&self, id: i64) -> Result<Option<Message>> {
        self.with_conn(|conn| {
            let changed = conn.execute("UPDATE messages SET read = 1 WHERE id = ?1", [id])?;
            if changed == 0 {
                return Ok(None);
            }
            query_message(conn, id)
        })
    }
}

// -- Row helpers --

/// Fixed-width RFC 3339 so lexical order in SQL matches time order.
fn timestamp_text(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn conversion_error(idx: usize, e: impl std::error::Error + Send + Sync + 'static) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
}

fn timestamp_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

fn enum_at<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let text: String = row.get(idx)?;
    text.parse().map_err(|e| conversion_error(idx, e))
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

fn query_user<P: rusqlite::Params>(conn: &Connection, filter: &str, params: P) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {filter}");
    let row = conn
        .query_row(&sql, params, |row| {
            Ok(UserRow {
                id: row.get(0)?,
                name: row.get(1)?,
                email: row.get(2)?,
                password: row.get(3)?,
                role: enum_at(row, 4)?,
                created_at: timestamp_at(row, 5)?,
            })
        })
        .optional()?;
    Ok(row)
}

fn ngo_from_row(row: &Row<'_>) -> rusqlite::Result<Ngo> {
    let focus_areas: String = row.get(8)?;
    Ok(Ngo {
        id: row.get(0)?,
        user_id: row.get(1)?,
        organization_name: row.get(2)?,
        description: row.get(3)?,
        mission: row.get(4)?,
        location: row.get(5)?,
        verified: row.get(6)?,
        impact_score: row.get(7)?,
        focus_areas: serde_json::from_str(&focus_areas).map_err(|e| conversion_error(8, e))?,
        registration_number: row.get(9)?,
        website: row.get(10)?,
        phone: row.get(11)?,
        created_at: timestamp_at(row, 12)?,
    })
}

fn query_ngo(conn: &Connection, id: i64) -> Result<Option<Ngo>> {
    let sql = format!("SELECT {NGO_COLUMNS} FROM ngos WHERE id = ?1");
    Ok(conn.query_row(&sql, [id], ngo_from_row).optional()?)
}

fn donation_from_row(row: &Row<'_>) -> rusqlite::Result<Donation> {
    Ok(Donation {
        id: row.get(0)?,
        donor_id: row.get(1)?,
        ngo_id: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        donation_type: enum_at(row, 5)?,
        quantity: row.get(6)?,
        amount: row.get(7)?,
        status: enum_at(row, 8)?,
        urgency: enum_at(row, 9)?,
        pickup_address: row.get(10)?,
        pickup_time: row.get(11)?,
        estimated_impact: row.get(12)?,
        actual_impact: row.get(13)?,
        created_at: timestamp_at(row, 14)?,
        updated_at: timestamp_at(row, 15)?,
    })
}

fn query_donation(conn: &Connection, id: i64) -> Result<Option<Donation>> {
    let sql = format!("SELECT {DONATION_COLUMNS} FROM donations WHERE id = ?1");
    Ok(conn.query_row(&sql, [id], donation_from_row).optional()?)
}

/// Newest first, the order dashboards list donations in.
fn query_donations<P: rusqlite::Params>(conn: &Connection, filter: &str, params: P) -> Result<Vec<Donation>> {
    let sql = format!("SELECT {DONATION_COLUMNS} FROM donations WHERE {filter} ORDER BY created_at DESC, id DESC");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params, donation_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn insert_update(
    conn: &Connection,
    donation_id: i64,
    status: DonationStatus,
    note: Option<&str>,
    updated_by: i64,
    at: &str,
) -> Result<()> {
    conn.execute(
        "INSERT INTO donation_updates (donation_id, status, message, updated_by, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![donation_id, status.as_str(), note, updated_by, at],
    )?;
    Ok(())
}

fn update_from_row(row: &Row<'_>) -> rusqlite::Result<DonationUpdate> {
    Ok(DonationUpdate {
        id: row.get(0)?,
        donation_id: row.get(1)?,
        status: enum_at(row, 2)?,
        message: row.get(3)?,
        updated_by: row.get(4)?,
        created_at: timestamp_at(row, 5)?,
    })
}

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<Message> {
    Ok(Message {
        id: row.get(0)?,
        sender_id: row.get(1)?,
        receiver_id: row.get(2)?,
        donation_id: row.get(3)?,
        content: row.get(4)?,
        message_type: enum_at(row, 5)?,
        read: row.get(6)?,
        created_at: timestamp_at(row, 7)?,
    })
}

fn query_message(conn: &Connection, id: i64) -> Result<Option<Message>> {
    let sql = format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1");
    Ok(conn.query_row(&sql, [id], message_from_row).optional()?)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use sahyog_types::models::{DonationType, MessageType, Urgency};

    use super::*;

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn user(db: &Database, email: &str, role: Role) -> User {
        db.create_user("Test User", email, "hash", role).unwrap().unwrap()
    }

    fn ngo(db: &Database, owner: &User) -> Ngo {
        let req = CreateNgoRequest {
            organization_name: "Bright Future Foundation".into(),
            description: None,
            mission: None,
            location: "Mumbai, Maharashtra".into(),
            focus_areas: vec!["Education".into(), "Nutrition".into()],
            registration_number: None,
            website: None,
            phone: None,
        };
        db.create_ngo(owner.id, &req).unwrap().unwrap()
    }

    fn rice_bags() -> CreateDonationRequest {
        CreateDonationRequest {
            title: "Rice bags".into(),
            description: None,
            donation_type: DonationType::Food,
            quantity: "20 bags".into(),
            amount: None,
            urgency: Urgency::High,
            pickup_address: "12 MG Road".into(),
            pickup_time: None,
            estimated_impact: Some(40),
        }
    }

    fn message(receiver_id: i64, content: &str) -> SendMessageRequest {
        SendMessageRequest {
            receiver_id,
            content: content.into(),
            message_type: MessageType::Text,
            donation_id: None,
        }
    }

    #[test]
    fn duplicate_email_is_reported_not_raised() {
        let db = db();
        user(&db, "asha@example.org", Role::Donor);
        let again = db.create_user("Other", "asha@example.org", "hash", Role::Ngo).unwrap();
        assert!(again.is_none());
    }

    #[test]
    fn one_ngo_per_user() {
        let db = db();
        let owner = user(&db, "priya@brightfuture.org", Role::Ngo);
        let first = ngo(&db, &owner);
        assert!(!first.verified);
        assert_eq!(first.focus_areas, vec!["Education", "Nutrition"]);

        let second = db
            .create_ngo(owner.id, &CreateNgoRequest {
                organization_name: "Second".into(),
                description: None,
                mission: None,
                location: "Pune".into(),
                focus_areas: vec![],
                registration_number: None,
                website: None,
                phone: None,
            })
            .unwrap();
        assert!(second.is_none());
    }

    #[test]
    fn verification_moves_ngo_between_lists() {
        let db = db();
        let owner = user(&db, "priya@brightfuture.org", Role::Ngo);
        let org = ngo(&db, &owner);

        assert!(db.list_ngos(true).unwrap().is_empty());
        assert_eq!(db.list_ngos(false).unwrap().len(), 1);

        let verified = db.set_ngo_verified(org.id, true).unwrap().unwrap();
        assert!(verified.verified);
        assert_eq!(db.list_ngos(true).unwrap()[0].id, org.id);
        assert!(db.list_ngos(false).unwrap().is_empty());

        assert!(db.set_ngo_verified(999, true).unwrap().is_none());
    }

    #[test]
    fn created_donation_is_pending_with_audit_record() {
        let db = db();
        let donor = user(&db, "john@example.com", Role::Donor);
        let donation = db.create_donation(donor.id, &rice_bags()).unwrap();

        assert_eq!(donation.status, DonationStatus::Pending);
        assert_eq!(donation.ngo_id, None);
        assert_eq!(donation.created_at, donation.updated_at);
        assert_eq!(db.get_donation(donation.id).unwrap().unwrap(), donation);

        let trail = db.get_donation_updates(donation.id).unwrap();
        assert_eq!(trail.len(), 1);
        assert_eq!(trail[0].status, DonationStatus::Pending);
        assert_eq!(trail[0].updated_by, donor.id);
    }

    #[test]
    fn transition_requires_expected_status() {
        let db = db();
        let donor = user(&db, "john@example.com", Role::Donor);
        let owner = user(&db, "priya@brightfuture.org", Role::Ngo);
        let org = ngo(&db, &owner);
        let donation = db.create_donation(donor.id, &rice_bags()).unwrap();

        let stale = db
            .transition_donation(&Transition {
                donation_id: donation.id,
                from: DonationStatus::Accepted,
                to: DonationStatus::InTransit,
                ngo_id: None,
                actual_impact: None,
                updated_by: owner.id,
                note: None,
            })
            .unwrap();
        assert!(stale.is_none());
        assert_eq!(db.get_donation_updates(donation.id).unwrap().len(), 1);

        let accepted = db
            .transition_donation(&Transition {
                donation_id: donation.id,
                from: DonationStatus::Pending,
                to: DonationStatus::Accepted,
                ngo_id: Some(org.id),
                actual_impact: None,
                updated_by: owner.id,
                note: Some("On our way"),
            })
            .unwrap()
            .unwrap();
        assert_eq!(accepted.status, DonationStatus::Accepted);
        assert_eq!(accepted.ngo_id, Some(org.id));
        assert!(accepted.updated_at >= accepted.created_at);

        let trail = db.get_donation_updates(donation.id).unwrap();
        assert_eq!(trail.len(), 2);
        assert_eq!(trail[1].message.as_deref(), Some("On our way"));
    }

    #[test]
    fn concurrent_accepts_have_one_winner() {
        let db = Arc::new(db());
        let donor = user(&db, "john@example.com", Role::Donor);
        let donation = db.create_donation(donor.id, &rice_bags()).unwrap();

        let contenders: Vec<(User, Ngo)> = (0..8)
            .map(|i| {
                let owner = user(&db, &format!("ngo{i}@example.org"), Role::Ngo);
                let org = ngo(&db, &owner);
                (owner, org)
            })
            .collect();

        let handles: Vec<_> = contenders
            .iter()
            .map(|(owner, org)| {
                let db = db.clone();
                let (owner_id, ngo_id, donation_id) = (owner.id, org.id, donation.id);
                thread::spawn(move || {
                    db.transition_donation(&Transition {
                        donation_id,
                        from: DonationStatus::Pending,
                        to: DonationStatus::Accepted,
                        ngo_id: Some(ngo_id),
                        actual_impact: None,
                        updated_by: owner_id,
                        note: None,
                    })
                    .unwrap()
                })
            })
            .collect();

        let winners: Vec<Donation> = handles.into_iter().filter_map(|h| h.join().unwrap()).collect();
        assert_eq!(winners.len(), 1);

        let stored = db.get_donation(donation.id).unwrap().unwrap();
        assert_eq!(stored.status, DonationStatus::Accepted);
        assert_eq!(stored.ngo_id, winners[0].ngo_id);
    }

    #[test]
    fn role_scoped_listings() {
        let db = db();
        let alice = user(&db, "alice@example.com", Role::Donor);
        let bob = user(&db, "bob@example.com", Role::Donor);
        db.create_donation(alice.id, &rice_bags()).unwrap();
        db.create_donation(bob.id, &rice_bags()).unwrap();

        let mine = db.list_donations_by_donor(alice.id).unwrap();
        assert_eq!(mine.len(), 1);
        assert!(mine.iter().all(|d| d.donor_id == alice.id));
        assert_eq!(db.list_donations_by_status(DonationStatus::Pending).unwrap().len(), 2);
    }

    #[test]
    fn stats_cover_pending_donations_only() {
        let db = db();
        let donor = user(&db, "john@example.com", Role::Donor);
        let owner = user(&db, "priya@brightfuture.org", Role::Ngo);
        let org = ngo(&db, &owner);
        db.set_ngo_verified(org.id, true).unwrap();

        let mut money = rice_bags();
        money.donation_type = DonationType::Money;
        money.amount = Some(250.5);
        db.create_donation(donor.id, &money).unwrap();
        let taken = db.create_donation(donor.id, &rice_bags()).unwrap();
        db.transition_donation(&Transition {
            donation_id: taken.id,
            from: DonationStatus::Pending,
            to: DonationStatus::Accepted,
            ngo_id: Some(org.id),
            actual_impact: None,
            updated_by: owner.id,
            note: None,
        })
        .unwrap();

        let stats = db.platform_stats().unwrap();
        assert_eq!(stats.total_donations, 1);
        assert_eq!(stats.verified_ngos, 1);
        assert_eq!(stats.total_value, 250.5);
        assert_eq!(stats.lives_impacted, 40);
    }

    #[test]
    fn conversation_is_chronological_between_the_pair() {
        let db = db();
        let a = user(&db, "a@example.com", Role::Donor);
        let b = user(&db, "b@example.com", Role::Ngo);
        let c = user(&db, "c@example.com", Role::Admin);

        db.insert_message(a.id, &message(b.id, "first")).unwrap();
        db.insert_message(b.id, &message(a.id, "second")).unwrap();
        db.insert_message(c.id, &message(a.id, "elsewhere")).unwrap();
        db.insert_message(a.id, &message(b.id, "third")).unwrap();

        let thread: Vec<String> = db
            .get_conversation(b.id, a.id)
            .unwrap()
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(thread, ["first", "second", "third"]);
    }

    #[test]
    fn summaries_keep_latest_per_correspondent_newest_first() {
        let db = db();
        let me = user(&db, "me@example.com", Role::Donor);
        let x = user(&db, "x@example.com", Role::Ngo);
        let y = user(&db, "y@example.com", Role::Ngo);
        let z = user(&db, "z@example.com", Role::Admin);

        db.insert_message(me.id, &message(x.id, "t1")).unwrap();
        db.insert_message(y.id, &message(me.id, "t2")).unwrap();
        db.insert_message(me.id, &message(z.id, "t3")).unwrap();
        db.insert_message(x.id, &message(me.id, "t4")).unwrap();

        let summaries: Vec<(i64, String)> = db
            .get_conversation_summaries(me.id)
            .unwrap()
            .into_iter()
            .map(|m| (m.correspondent_of(me.id), m.content))
            .collect();
        assert_eq!(
            summaries,
            [(x.id, "t4".to_string()), (z.id, "t3".to_string()), (y.id, "t2".to_string())]
        );
    }

    #[test]
    fn only_read_flag_changes() {
        let db = db();
        let a = user(&db, "a@example.com", Role::Donor);
        let b = user(&db, "b@example.com", Role::Ngo);
        let sent = db.insert_message(a.id, &message(b.id, "hello")).unwrap();
        assert!(!sent.read);

        let read = db.mark_message_read(sent.id).unwrap().unwrap();
        assert!(read.read);
        assert_eq!(read.content, sent.content);
        assert_eq!(read.created_at, sent.created_at);
        assert!(db.mark_message_read(404).unwrap().is_none());
    }
}
