// Copyright (c) 2021-2026 RBB S.r.l
// opensource@mintlayer.org
// SPDX-License-Identifier: MIT
// Licensed under the MIT License;
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// https://github.com/mintlayer/mintlayer-core/blob/master/LICENSE
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Authorization rules for databases and their registry records.
//!
//! A [Policy] starts from a default decision that `allow_if`/`deny_if` calls move; the last
//! call whose condition holds wins, so callers apply the most specific rule last. The `assert_*`
//! functions are pure: everything they need to know about the registry is passed in an [Actor]
//! and the records involved.

use crate::{primitives::SYSTEM_USER_KEY, registry::DatabaseRecord, DbId, Error, Principal, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    decision: Decision,
    reason: Option<String>,
}

impl Policy {
    pub fn new(decision: Decision) -> Self {
        Self {
            decision,
            reason: None,
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            decision: Decision::Deny,
            reason: Some(reason.into()),
        }
    }

    pub fn decision(&self) -> Decision {
        self.decision
    }

    pub fn allow_if(&mut self, cond: bool) -> &mut Self {
        if cond {
            self.decision = Decision::Allow;
        }
        self
    }

    /// The first reason given is the one reported
    pub fn deny_if(&mut self, cond: bool, reason: impl Into<String>) -> &mut Self {
        if cond {
            self.decision = Decision::Deny;
            self.reason.get_or_insert_with(|| reason.into());
        }
        self
    }

    pub fn assert(&self) -> Result<()> {
        match self.decision {
            Decision::Allow => Ok(()),
            Decision::Deny => Err(Error::Permissions(
                self.reason.clone().unwrap_or_else(|| "Not authorized".to_owned()),
            )),
        }
    }
}

/// A principal together with the registry facts about it
#[derive(Debug, Clone, Copy)]
pub struct Actor<'a> {
    pub principal: &'a Principal,
    /// Role `admin`, or the system user
    pub is_admin: bool,
    pub system_service_key: &'a str,
}

impl<'a> Actor<'a> {
    pub fn new(principal: &'a Principal, is_admin: bool, system_service_key: &'a str) -> Self {
        Self {
            principal,
            is_admin: is_admin || principal.user_key == SYSTEM_USER_KEY,
            system_service_key,
        }
    }

    fn user_key(&self) -> &str {
        &self.principal.user_key
    }

    fn service_key(&self) -> &str {
        &self.principal.service_key
    }

    fn is_system_service(&self, service_key: Option<&str>) -> bool {
        service_key == Some(self.system_service_key)
    }
}

/// `record` is the registry record of `db_id`, if any. The registry database itself has none
/// and is only readable by admins.
pub fn assert_can_read_database(
    actor: &Actor,
    db_id: &DbId,
    record: Option<&DatabaseRecord>,
    is_registry: bool,
) -> Result<()> {
    let mut p = Policy::deny(format!("Not authorized to access {db_id}"));
    p.allow_if(!is_registry && record.is_none());
    if let Some(record) = record {
        let owns_user = record.owning_user_key.as_deref() == Some(actor.user_key());
        let owning_service = record.owning_service_key.as_deref();
        p.allow_if(record.network.access == crate::AccessMode::Public);
        p.allow_if(owns_user && owning_service == Some(actor.service_key()));
        p.allow_if(
            owns_user
                && (actor.is_system_service(owning_service)
                    || actor.is_system_service(Some(actor.service_key()))
                    || record.grant(actor.service_key()).is_some()),
        );
    }
    p.allow_if(actor.is_admin);
    p.assert()
}

/// Check a change of a registry record from `old` to `new` (`None` for creation and deletion).
/// `new_service_owner` is the user owning the new owning service, when ownership moves to a
/// service other than the previous owner and the acting one.
pub fn assert_can_write_database_record(
    actor: &Actor,
    old: Option<&DatabaseRecord>,
    new: Option<&DatabaseRecord>,
    new_service_owner: Option<&str>,
) -> Result<()> {
    if actor.is_admin {
        return Ok(());
    }
    let mut p = Policy::new(Decision::Allow);
    if let Some(old) = old {
        p.deny_if(
            old.owning_user_key.as_deref() != Some(actor.user_key()),
            "Can't configure a database owned by a different user",
        );
        let owning_service = old.owning_service_key.as_deref();
        p.deny_if(
            owning_service != Some(actor.service_key())
                && !actor.is_system_service(Some(actor.service_key()))
                && !actor.is_system_service(owning_service),
            "Can't configure a database owned by a different service",
        );
    }
    if let Some(new) = new {
        p.deny_if(
            new.owning_user_key.as_deref() != Some(actor.user_key()),
            "Can't change the owning user of a database",
        );
        if let Some(service) = moved_to_foreign_service(actor, old, new) {
            p.deny_if(
                new_service_owner.is_none(),
                format!("Invalid owning service: {service}. Key does not map to any known services"),
            );
            p.deny_if(
                new_service_owner.is_some_and(|owner| owner != actor.user_key())
                    && !actor.is_system_service(Some(service)),
                "Can't configure a database to be owned by a service owned by another user",
            );
        }
    }
    p.assert()
}

/// The new owning service, if ownership moves to a service that is neither the previous owner
/// nor the acting one
pub fn moved_to_foreign_service<'r>(
    actor: &Actor,
    old: Option<&DatabaseRecord>,
    new: &'r DatabaseRecord,
) -> Option<&'r str> {
    let service = new.owning_service_key.as_deref()?;
    let old_service = old.and_then(|old| old.owning_service_key.as_deref());
    (Some(service) != old_service && service != actor.service_key()).then_some(service)
}

/// Check a change that only touches the acting service's own grant on a database
pub fn assert_can_write_service_grant(
    actor: &Actor,
    old: Option<&DatabaseRecord>,
    new: &DatabaseRecord,
) -> Result<()> {
    if actor.is_admin {
        return Ok(());
    }
    let mut p = Policy::new(Decision::Allow);
    match old {
        Some(old) => {
            p.deny_if(
                old.owning_user_key.as_deref() != Some(actor.user_key()),
                "Can't configure a database owned by a different user",
            );
            p.deny_if(
                old.without_grant(actor.service_key()) != new.without_grant(actor.service_key()),
                "A service can only change its own access to a database",
            );
        }
        None => {
            p.deny_if(
                new.owning_user_key.as_deref() != Some(actor.user_key()),
                "Can't change the owning user of a database",
            );
        }
    }
    p.assert()
}

pub fn assert_can_enumerate_databases_owned_by(actor: &Actor, user_key: &str) -> Result<()> {
    let mut p = Policy::deny("Cannot enumerate databases owned by another user");
    p.allow_if(actor.is_admin);
    p.allow_if(actor.user_key() == user_key);
    p.assert()
}

pub fn assert_is_admin(actor: &Actor, action: &str) -> Result<()> {
    let mut p = Policy::deny(format!("Only admins can {action}"));
    p.allow_if(actor.is_admin);
    p.assert()
}
