use chrono::{DateTime, Utc};
use delhi_duty::accounts::{
    AccountRepositoryError, OtpDeliveryError, OtpPurpose, OtpRecord, OtpSender, OtpStore,
    UserAccount, UserId, UserRepository,
};
use delhi_duty::colonies::{ColonyDirectory, ColonyImportError};
use delhi_duty::config::DataConfig;
use delhi_duty::error::AppError;
use delhi_duty::history::{CalcEvent, EventLog, HistoryError, HistoryRecord, HistoryRepository};
use delhi_duty::rates::RateSchedule;
use delhi_duty::valuation::{OwnershipType, PropertyUse, RateCategory};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

// Fallback directory used until a full COLONY_CSV is configured.
const SEED_COLONIES_CSV: &str = "\
colony_name,category
Anand Niketan,A
Vasant Vihar,A
Defence Colony,A
Greater Kailash I,B
Green Park,B
Punjabi Bagh,B
Lajpat Nagar,C
Malviya Nagar,C
Rajouri Garden,C
Rohini,D
Pitampura,D
Uttam Nagar,E
Dilshad Garden,F
Mangolpuri,G
Aali,H
Bawana,H
";

pub(crate) fn load_colonies(data: &DataConfig) -> Result<ColonyDirectory, AppError> {
    let directory = match &data.colonies_csv {
        Some(path) => ColonyDirectory::from_csv_path(path)?,
        None => builtin_colonies()?,
    };
    info!(colonies = directory.len(), "colony directory loaded");
    Ok(directory)
}

pub(crate) fn builtin_colonies() -> Result<ColonyDirectory, ColonyImportError> {
    ColonyDirectory::from_csv_reader(SEED_COLONIES_CSV.as_bytes())
}

pub(crate) fn load_schedule(data: &DataConfig) -> Result<RateSchedule, AppError> {
    match &data.rate_schedule {
        Some(path) => {
            let file = std::fs::File::open(path)?;
            Ok(RateSchedule::from_json_reader(file)?)
        }
        None => Ok(RateSchedule::statutory()),
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryUserRepository {
    accounts: Arc<Mutex<Vec<UserAccount>>>,
}

impl UserRepository for InMemoryUserRepository {
    fn insert(&self, account: UserAccount) -> Result<UserAccount, AccountRepositoryError> {
        let mut guard = self.accounts.lock().expect("user mutex poisoned");
        if guard
            .iter()
            .any(|existing| existing.email == account.email || existing.id == account.id)
        {
            return Err(AccountRepositoryError::Conflict);
        }
        guard.push(account.clone());
        Ok(account)
    }

    fn by_email(&self, email: &str) -> Result<Option<UserAccount>, AccountRepositoryError> {
        let guard = self.accounts.lock().expect("user mutex poisoned");
        Ok(guard.iter().find(|account| account.email == email).cloned())
    }

    fn by_username(&self, username: &str) -> Result<Option<UserAccount>, AccountRepositoryError> {
        let guard = self.accounts.lock().expect("user mutex poisoned");
        Ok(guard
            .iter()
            .find(|account| account.username == username)
            .cloned())
    }

    fn update_password(
        &self,
        email: &str,
        password_digest: String,
    ) -> Result<(), AccountRepositoryError> {
        let mut guard = self.accounts.lock().expect("user mutex poisoned");
        match guard.iter_mut().find(|account| account.email == email) {
            Some(account) => {
                account.password_digest = password_digest;
                Ok(())
            }
            None => Err(AccountRepositoryError::NotFound),
        }
    }

    fn touch_last_login(
        &self,
        id: &UserId,
        at: DateTime<Utc>,
    ) -> Result<(), AccountRepositoryError> {
        let mut guard = self.accounts.lock().expect("user mutex poisoned");
        match guard.iter_mut().find(|account| &account.id == id) {
            Some(account) => {
                account.last_login = Some(at);
                Ok(())
            }
            None => Err(AccountRepositoryError::NotFound),
        }
    }

    fn delete(&self, id: &UserId) -> Result<(), AccountRepositoryError> {
        let mut guard = self.accounts.lock().expect("user mutex poisoned");
        let before = guard.len();
        guard.retain(|account| &account.id != id);
        if guard.len() == before {
            return Err(AccountRepositoryError::NotFound);
        }
        Ok(())
    }

    fn list(&self) -> Result<Vec<UserAccount>, AccountRepositoryError> {
        let guard = self.accounts.lock().expect("user mutex poisoned");
        Ok(guard.clone())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryOtpStore {
    records: Arc<Mutex<Vec<OtpRecord>>>,
}

impl OtpStore for InMemoryOtpStore {
    fn append(&self, record: OtpRecord) -> Result<(), AccountRepositoryError> {
        let mut guard = self.records.lock().expect("otp mutex poisoned");
        guard.push(record);
        Ok(())
    }

    fn latest_for(
        &self,
        email: &str,
        purpose: OtpPurpose,
    ) -> Result<Option<OtpRecord>, AccountRepositoryError> {
        let guard = self.records.lock().expect("otp mutex poisoned");
        Ok(guard
            .iter()
            .rev()
            .find(|record| record.email == email && record.purpose == purpose)
            .cloned())
    }

    fn mark_used(
        &self,
        email: &str,
        purpose: OtpPurpose,
        code: &str,
    ) -> Result<(), AccountRepositoryError> {
        let mut guard = self.records.lock().expect("otp mutex poisoned");
        match guard
            .iter_mut()
            .rev()
            .find(|record| record.email == email && record.purpose == purpose && record.code == code)
        {
            Some(record) => {
                record.used = true;
                Ok(())
            }
            None => Err(AccountRepositoryError::NotFound),
        }
    }

    fn list(&self) -> Result<Vec<OtpRecord>, AccountRepositoryError> {
        let guard = self.records.lock().expect("otp mutex poisoned");
        Ok(guard.clone())
    }

    fn clear(&self) -> Result<usize, AccountRepositoryError> {
        let mut guard = self.records.lock().expect("otp mutex poisoned");
        let removed = guard.len();
        guard.clear();
        Ok(removed)
    }
}

/// OTP "transport" used by the service binary: announces the dispatch on the
/// log and keeps the code so the CLI demo can complete its flow. A real
/// deployment swaps in an SMTP-backed sender here.
#[derive(Default, Clone)]
pub(crate) struct RecordingOtpSender {
    sent: Arc<Mutex<Vec<(String, String, OtpPurpose)>>>,
}

impl RecordingOtpSender {
    pub(crate) fn last_code_for(&self, email: &str) -> Option<String> {
        let guard = self.sent.lock().expect("sender mutex poisoned");
        guard
            .iter()
            .rev()
            .find(|(to, _, _)| to == email)
            .map(|(_, code, _)| code.clone())
    }
}

impl OtpSender for RecordingOtpSender {
    fn send(&self, email: &str, code: &str, purpose: OtpPurpose) -> Result<(), OtpDeliveryError> {
        info!(%email, purpose = purpose.label(), "otp dispatch requested");
        let mut guard = self.sent.lock().expect("sender mutex poisoned");
        guard.push((email.to_string(), code.to_string(), purpose));
        Ok(())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryHistoryRepository {
    records: Arc<Mutex<Vec<HistoryRecord>>>,
}

impl HistoryRepository for InMemoryHistoryRepository {
    fn insert(&self, record: HistoryRecord) -> Result<HistoryRecord, HistoryError> {
        let mut guard = self.records.lock().expect("history mutex poisoned");
        guard.push(record.clone());
        Ok(record)
    }

    fn for_user(&self, user: &UserId) -> Result<Vec<HistoryRecord>, HistoryError> {
        let guard = self.records.lock().expect("history mutex poisoned");
        let mut records: Vec<_> = guard
            .iter()
            .filter(|record| &record.user == user)
            .cloned()
            .collect();
        records.reverse();
        Ok(records)
    }

    fn recent(&self, limit: usize) -> Result<Vec<HistoryRecord>, HistoryError> {
        let guard = self.records.lock().expect("history mutex poisoned");
        Ok(guard.iter().rev().take(limit).cloned().collect())
    }

    fn delete_for_user(&self, user: &UserId) -> Result<usize, HistoryError> {
        let mut guard = self.records.lock().expect("history mutex poisoned");
        let before = guard.len();
        guard.retain(|record| &record.user != user);
        Ok(before - guard.len())
    }

    fn clear(&self) -> Result<usize, HistoryError> {
        let mut guard = self.records.lock().expect("history mutex poisoned");
        let removed = guard.len();
        guard.clear();
        Ok(removed)
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryEventLog {
    events: Arc<Mutex<Vec<CalcEvent>>>,
}

impl EventLog for InMemoryEventLog {
    fn record(&self, event: CalcEvent) -> Result<(), HistoryError> {
        let mut guard = self.events.lock().expect("event mutex poisoned");
        guard.push(event);
        Ok(())
    }

    fn recent(&self, limit: usize) -> Result<Vec<CalcEvent>, HistoryError> {
        let guard = self.events.lock().expect("event mutex poisoned");
        Ok(guard.iter().rev().take(limit).cloned().collect())
    }

    fn count(&self) -> Result<usize, HistoryError> {
        let guard = self.events.lock().expect("event mutex poisoned");
        Ok(guard.len())
    }

    fn clear(&self) -> Result<usize, HistoryError> {
        let mut guard = self.events.lock().expect("event mutex poisoned");
        let removed = guard.len();
        guard.clear();
        Ok(removed)
    }
}

// clap value parsers for the enum-typed flags.

pub(crate) fn parse_use(raw: &str) -> Result<PropertyUse, String> {
    raw.parse::<PropertyUse>().map_err(|err| err.to_string())
}

pub(crate) fn parse_category(raw: &str) -> Result<RateCategory, String> {
    raw.parse::<RateCategory>().map_err(|err| err.to_string())
}

pub(crate) fn parse_ownership(raw: &str) -> Result<OwnershipType, String> {
    raw.parse::<OwnershipType>().map_err(|err| err.to_string())
}
