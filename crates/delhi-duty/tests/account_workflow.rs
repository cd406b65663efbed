//! Integration specifications for the OTP-gated account flows.

mod common {
    use std::sync::{Arc, Mutex};

    use chrono::{DateTime, Utc};
    use delhi_duty::accounts::{
        AccountRepositoryError, AccountService, OtpDeliveryError, OtpPurpose, OtpRecord,
        OtpSender, OtpStore, UserAccount, UserId, UserRepository,
    };

    #[derive(Default, Clone)]
    pub(super) struct MemoryUsers {
        accounts: Arc<Mutex<Vec<UserAccount>>>,
    }

    impl UserRepository for MemoryUsers {
        fn insert(&self, account: UserAccount) -> Result<UserAccount, AccountRepositoryError> {
            let mut guard = self.accounts.lock().expect("lock");
            if guard.iter().any(|existing| existing.email == account.email) {
                return Err(AccountRepositoryError::Conflict);
            }
            guard.push(account.clone());
            Ok(account)
        }

        fn by_email(&self, email: &str) -> Result<Option<UserAccount>, AccountRepositoryError> {
            let guard = self.accounts.lock().expect("lock");
            Ok(guard.iter().find(|account| account.email == email).cloned())
        }

        fn by_username(
            &self,
            username: &str,
        ) -> Result<Option<UserAccount>, AccountRepositoryError> {
            let guard = self.accounts.lock().expect("lock");
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
            let mut guard = self.accounts.lock().expect("lock");
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
            let mut guard = self.accounts.lock().expect("lock");
            match guard.iter_mut().find(|account| &account.id == id) {
                Some(account) => {
                    account.last_login = Some(at);
                    Ok(())
                }
                None => Err(AccountRepositoryError::NotFound),
            }
        }

        fn delete(&self, id: &UserId) -> Result<(), AccountRepositoryError> {
            let mut guard = self.accounts.lock().expect("lock");
            let before = guard.len();
            guard.retain(|account| &account.id != id);
            if guard.len() == before {
                return Err(AccountRepositoryError::NotFound);
            }
            Ok(())
        }

        fn list(&self) -> Result<Vec<UserAccount>, AccountRepositoryError> {
            Ok(self.accounts.lock().expect("lock").clone())
        }
    }

    #[derive(Default, Clone)]
    pub(super) struct MemoryOtps {
        records: Arc<Mutex<Vec<OtpRecord>>>,
    }

    impl OtpStore for MemoryOtps {
        fn append(&self, record: OtpRecord) -> Result<(), AccountRepositoryError> {
            self.records.lock().expect("lock").push(record);
            Ok(())
        }

        fn latest_for(
            &self,
            email: &str,
            purpose: OtpPurpose,
        ) -> Result<Option<OtpRecord>, AccountRepositoryError> {
            let guard = self.records.lock().expect("lock");
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
            let mut guard = self.records.lock().expect("lock");
            match guard.iter_mut().rev().find(|record| {
                record.email == email && record.purpose == purpose && record.code == code
            }) {
                Some(record) => {
                    record.used = true;
                    Ok(())
                }
                None => Err(AccountRepositoryError::NotFound),
            }
        }

        fn list(&self) -> Result<Vec<OtpRecord>, AccountRepositoryError> {
            Ok(self.records.lock().expect("lock").clone())
        }

        fn clear(&self) -> Result<usize, AccountRepositoryError> {
            let mut guard = self.records.lock().expect("lock");
            let removed = guard.len();
            guard.clear();
            Ok(removed)
        }
    }

    /// Captures dispatched codes so tests can complete the flows.
    #[derive(Default, Clone)]
    pub(super) struct CapturingSender {
        sent: Arc<Mutex<Vec<(String, String, OtpPurpose)>>>,
    }

    impl CapturingSender {
        pub(super) fn last_code_for(&self, email: &str) -> Option<String> {
            let guard = self.sent.lock().expect("lock");
            guard
                .iter()
                .rev()
                .find(|(to, _, _)| to == email)
                .map(|(_, code, _)| code.clone())
        }

        pub(super) fn sent_count(&self) -> usize {
            self.sent.lock().expect("lock").len()
        }
    }

    impl OtpSender for CapturingSender {
        fn send(
            &self,
            email: &str,
            code: &str,
            purpose: OtpPurpose,
        ) -> Result<(), OtpDeliveryError> {
            self.sent
                .lock()
                .expect("lock")
                .push((email.to_string(), code.to_string(), purpose));
            Ok(())
        }
    }

    pub(super) fn build_service() -> (
        AccountService<MemoryUsers, MemoryOtps, CapturingSender>,
        Arc<MemoryUsers>,
        Arc<CapturingSender>,
    ) {
        let users = Arc::new(MemoryUsers::default());
        let otps = Arc::new(MemoryOtps::default());
        let sender = Arc::new(CapturingSender::default());
        let service = AccountService::new(users.clone(), otps.clone(), sender.clone());
        (service, users, sender)
    }
}

mod signup {
    use super::common::*;
    use chrono::{Duration, Utc};
    use delhi_duty::accounts::{AccountError, UserRepository};

    #[test]
    fn otp_gated_signup_creates_a_verified_account() {
        let (service, users, sender) = build_service();
        let now = Utc::now();

        service
            .begin_signup("Buyer@Example.in", "buyer", now)
            .expect("otp issued");
        assert_eq!(sender.sent_count(), 1);

        let code = sender
            .last_code_for("buyer@example.in")
            .expect("code captured");
        assert_eq!(code.len(), 6);

        let account = service
            .confirm_signup("buyer@example.in", "buyer", &code, "secret", now)
            .expect("account created");
        assert!(account.is_verified);
        assert_eq!(account.email, "buyer@example.in");

        let stored = users
            .by_email("buyer@example.in")
            .expect("repo")
            .expect("present");
        // Only the digest is stored, never the clear-text password.
        assert_ne!(stored.password_digest, "secret");
        assert_eq!(stored.password_digest.len(), 64);
    }

    #[test]
    fn wrong_code_is_rejected() {
        let (service, _, _) = build_service();
        let now = Utc::now();
        service
            .begin_signup("a@example.in", "aname", now)
            .expect("otp issued");

        assert!(matches!(
            service.confirm_signup("a@example.in", "aname", "000000", "pw", now),
            Err(AccountError::InvalidOtp)
        ));
    }

    #[test]
    fn expired_code_is_rejected() {
        let (service, _, sender) = build_service();
        let issued = Utc::now();
        service
            .begin_signup("b@example.in", "bname", issued)
            .expect("otp issued");
        let code = sender.last_code_for("b@example.in").expect("code");

        let later = issued + Duration::minutes(11);
        assert!(matches!(
            service.confirm_signup("b@example.in", "bname", &code, "pw", later),
            Err(AccountError::InvalidOtp)
        ));
    }

    #[test]
    fn a_code_cannot_be_used_twice() {
        let (service, _, sender) = build_service();
        let now = Utc::now();
        service
            .begin_signup("c@example.in", "cname", now)
            .expect("otp issued");
        let code = sender.last_code_for("c@example.in").expect("code");

        service
            .confirm_signup("c@example.in", "cname", &code, "pw", now)
            .expect("first use succeeds");
        assert!(matches!(
            service.confirm_signup("c@example.in", "cname2", &code, "pw", now),
            Err(AccountError::InvalidOtp)
        ));
    }

    #[test]
    fn duplicate_email_and_username_are_rejected_before_otp_dispatch() {
        let (service, _, sender) = build_service();
        let now = Utc::now();
        service
            .begin_signup("d@example.in", "dname", now)
            .expect("otp issued");
        let code = sender.last_code_for("d@example.in").expect("code");
        service
            .confirm_signup("d@example.in", "dname", &code, "pw", now)
            .expect("account created");
        let dispatched = sender.sent_count();

        assert!(matches!(
            service.begin_signup("d@example.in", "other", now),
            Err(AccountError::EmailTaken(_))
        ));
        assert!(matches!(
            service.begin_signup("fresh@example.in", "dname", now),
            Err(AccountError::UsernameTaken(_))
        ));
        assert_eq!(sender.sent_count(), dispatched);
    }
}

mod login {
    use super::common::*;
    use chrono::Utc;
    use delhi_duty::accounts::AccountError;

    #[test]
    fn login_works_by_email_or_username_and_stamps_last_login() {
        let (service, _, sender) = build_service();
        let now = Utc::now();
        service
            .begin_signup("e@example.in", "ename", now)
            .expect("otp issued");
        let code = sender.last_code_for("e@example.in").expect("code");
        service
            .confirm_signup("e@example.in", "ename", &code, "pw", now)
            .expect("account created");

        let by_email = service.login("e@example.in", "pw", now).expect("email login");
        assert_eq!(by_email.last_login, Some(now));

        let by_username = service.login("ename", "pw", now).expect("username login");
        assert_eq!(by_username.email, "e@example.in");
    }

    #[test]
    fn wrong_password_and_unknown_user_fail_distinctly() {
        let (service, _, sender) = build_service();
        let now = Utc::now();
        service
            .begin_signup("f@example.in", "fname", now)
            .expect("otp issued");
        let code = sender.last_code_for("f@example.in").expect("code");
        service
            .confirm_signup("f@example.in", "fname", &code, "pw", now)
            .expect("account created");

        assert!(matches!(
            service.login("f@example.in", "nope", now),
            Err(AccountError::InvalidCredentials)
        ));
        assert!(matches!(
            service.login("ghost@example.in", "pw", now),
            Err(AccountError::UnknownUser(_))
        ));
    }
}

mod password_reset {
    use super::common::*;
    use chrono::Utc;
    use delhi_duty::accounts::AccountError;

    #[test]
    fn reset_flow_replaces_the_password() {
        let (service, _, sender) = build_service();
        let now = Utc::now();
        service
            .begin_signup("g@example.in", "gname", now)
            .expect("otp issued");
        let code = sender.last_code_for("g@example.in").expect("code");
        service
            .confirm_signup("g@example.in", "gname", &code, "old-pw", now)
            .expect("account created");

        let email = service
            .begin_password_reset("gname", now)
            .expect("reset otp issued");
        assert_eq!(email, "g@example.in");
        let reset_code = sender.last_code_for("g@example.in").expect("reset code");

        service
            .confirm_password_reset("g@example.in", &reset_code, "new-pw", now)
            .expect("password updated");

        assert!(matches!(
            service.login("gname", "old-pw", now),
            Err(AccountError::InvalidCredentials)
        ));
        service.login("gname", "new-pw", now).expect("new password works");
    }

    #[test]
    fn reset_for_unknown_identifier_fails() {
        let (service, _, _) = build_service();
        assert!(matches!(
            service.begin_password_reset("nobody", Utc::now()),
            Err(AccountError::UnknownUser(_))
        ));
    }

    #[test]
    fn signup_code_cannot_confirm_a_reset() {
        let (service, _, sender) = build_service();
        let now = Utc::now();
        service
            .begin_signup("h@example.in", "hname", now)
            .expect("otp issued");
        let signup_code = sender.last_code_for("h@example.in").expect("code");
        service
            .confirm_signup("h@example.in", "hname", &signup_code, "pw", now)
            .expect("account created");

        // No reset OTP was ever issued; the signup code must not work.
        assert!(matches!(
            service.confirm_password_reset("h@example.in", &signup_code, "new", now),
            Err(AccountError::InvalidOtp)
        ));
    }
}
