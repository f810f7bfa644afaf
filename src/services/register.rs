//! Membership registration, pending applications and manager approval.
//!
//! Applications are stored in `registereds` keyed by uid with the telephone
//! encrypted. Approval promotes the application into a `users` document and
//! charges the joining deposit to the activity ledger.

use std::sync::LazyLock;

use bson::{DateTime, doc};
use futures::TryStreamExt;
use mongodb::Database;
use mongodb::options::{ReplaceOptions, UpdateOptions};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::crypto::{CryptoError, PhoneCipher};
use super::identity::Identity;
use super::user::{self, Interests, Major, ROLE_HUMAN};
use super::{ServiceError, activity};
use crate::db;
use crate::push::PushFanout;

pub const JOIN_DEPOSIT: i64 = 3000;
pub const NEW_APPLICATION_TITLE: &str = "New member application";

static TELEPHONE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^010-\d{4}-\d{4}$").expect("telephone pattern is valid"));

/// Application fields supplied by the applicant. `uid` and `profileImage`
/// come from the token.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterForm {
    pub name: String,
    pub location: String,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub birth: Option<String>,
    pub telephone: String,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub mbti: Option<String>,
    #[serde(default)]
    pub majors: Vec<Major>,
    #[serde(default)]
    pub interests: Option<Interests>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Registered {
    pub uid: String,
    pub name: String,
    #[serde(default)]
    pub profile_image: Option<String>,
    pub location: String,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub birth: Option<String>,
    pub telephone: String,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub mbti: Option<String>,
    #[serde(default)]
    pub majors: Vec<Major>,
    #[serde(default)]
    pub interests: Option<Interests>,
}

/// Check the telephone format (`010-XXXX-XXXX`).
#[must_use]
pub fn is_valid_telephone(raw: &str) -> bool {
    TELEPHONE.is_match(raw)
}

/// Validate `form` and turn it into the stored application.
///
/// # Errors
///
/// Returns a validation error for a blank name or location or a malformed
/// telephone, and a crypto error if no key is configured.
pub fn build_application(form: RegisterForm, caller: &Identity, cipher: &PhoneCipher) -> Result<Registered, ServiceError> {
    let telephone = form.telephone.trim();
    if !is_valid_telephone(telephone) {
        return Err(ServiceError::validation("invalid telephone number"));
    }
    if form.name.trim().is_empty() || form.location.trim().is_empty() {
        return Err(ServiceError::validation("name and location are required"));
    }
    if !cipher.is_configured() {
        return Err(CryptoError::KeyMissing.into());
    }

    Ok(Registered {
        uid: caller.uid.clone(),
        name: form.name.trim().to_owned(),
        profile_image: caller.picture.clone(),
        location: form.location.trim().to_owned(),
        gender: form.gender,
        birth: form.birth,
        telephone: cipher.encrypt(telephone)?,
        comment: form.comment,
        mbti: form.mbti,
        majors: form.majors,
        interests: form.interests,
    })
}

fn collection(database: &Database) -> mongodb::Collection<Registered> {
    database.collection(db::REGISTEREDS)
}

/// Submit (or resubmit) the caller's application, then tell the managers of
/// its location.
///
/// # Errors
///
/// Returns a validation or crypto error from [`build_application`], or a
/// database error.
pub async fn register(
    database: &Database,
    cipher: &PhoneCipher,
    push: &PushFanout,
    caller: &Identity,
    form: RegisterForm,
) -> Result<(), ServiceError> {
    let application = build_application(form, caller, cipher)?;
    collection(database)
        .replace_one(
            doc! { "uid": application.uid.as_str() },
            &application,
            ReplaceOptions::builder().upsert(true).build(),
        )
        .await?;

    let managers = user::manager_uids(database, &application.location).await?;
    let body = format!("{} applied to join", application.name);
    push.notify_many(&managers, NEW_APPLICATION_TITLE, &body).await;
    Ok(())
}

/// `$set` body promoting an application to an active member.
///
/// # Errors
///
/// Returns an encode error if a nested field cannot be converted to BSON.
pub fn member_fields(application: &Registered, now: DateTime) -> Result<bson::Document, ServiceError> {
    Ok(doc! {
        "name": application.name.as_str(),
        "profileImage": application.profile_image.as_deref(),
        "location": application.location.as_str(),
        "gender": application.gender.as_deref(),
        "birth": application.birth.as_deref(),
        "telephone": application.telephone.as_str(),
        "comment": application.comment.as_deref(),
        "mbti": application.mbti.as_deref(),
        "majors": bson::to_bson(&application.majors)?,
        "interests": bson::to_bson(&application.interests)?,
        "role": ROLE_HUMAN,
        "registerDate": now,
        "isActive": true,
        "deposit": JOIN_DEPOSIT,
    })
}

/// Promote the pending application of `uid` into a member.
///
/// # Errors
///
/// Returns not-found if there is no pending application, or a database error.
pub async fn approve(database: &Database, uid: &str) -> Result<(), ServiceError> {
    let application = collection(database)
        .find_one(doc! { "uid": uid }, None)
        .await?
        .ok_or_else(|| ServiceError::not_found("registration"))?;

    user::collection(database)
        .update_one(
            doc! { "uid": uid },
            doc! {
                "$set": member_fields(&application, DateTime::now())?,
                "$setOnInsert": { "friend": [] },
            },
            UpdateOptions::builder().upsert(true).build(),
        )
        .await?;
    delete_register_user(database, uid).await?;

    activity::record(database, activity::KIND_DEPOSIT, uid, JOIN_DEPOSIT, "joining deposit").await?;
    tracing::info!(%uid, value = JOIN_DEPOSIT, "joining deposit recorded");
    Ok(())
}

/// Drop the pending application of `uid`. Missing applications are ignored.
///
/// # Errors
///
/// Returns a database error if the delete fails.
pub async fn delete_register_user(database: &Database, uid: &str) -> Result<(), ServiceError> {
    collection(database).delete_one(doc! { "uid": uid }, None).await?;
    Ok(())
}

/// Every pending application with its telephone decrypted.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn get_register(database: &Database, cipher: &PhoneCipher) -> Result<Vec<Registered>, ServiceError> {
    let applications: Vec<Registered> = collection(database).find(doc! {}, None).await?.try_collect().await?;
    Ok(applications
        .into_iter()
        .map(|mut a| {
            a.telephone = cipher.reveal(&a.telephone);
            a
        })
        .collect())
}

#[cfg(test)]
#[path = "register_test.rs"]
mod tests;
