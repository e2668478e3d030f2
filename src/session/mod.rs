//! Session state machine.
//!
//! `SessionManager` owns the only copy of the session token, the
//! inactivity deadline and the folder cache. All traffic to the store goes
//! through it: unauthenticated calls (login, unlock, checks) via `run`,
//! token-bearing calls via `run_with_session`, which is where idle expiry
//! is enforced and the deadline is pushed forward.
//!
//! There is no timer. Expiry is noticed on the next call that needs the
//! session and has the same effect as an explicit `lock()`.

pub mod clock;
pub mod persist;

pub use clock::{Clock, ManualClock, SystemClock};

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use zeroize::Zeroizing;

use crate::config::{transition, ConfigKey, ConfigTransition, FolderRefresh, Invalidation, Settings};
use crate::errors::{Result, VaultError};
use crate::invoker::Invoker;
use crate::outcome::{CliOutcome, Payload};
use crate::store::{StoreCommand, StoreKind, MFA_MARKERS, NOT_LOGGED_IN_MARKER, VAULT_LOCKED_MARKER};
use crate::vault::{FolderCache, QueryService};

#[derive(Default)]
struct Session {
    token: Option<Zeroizing<String>>,
    expires_at: Option<DateTime<Utc>>,
    mfa_required: bool,
}

/// Result of a login or unlock attempt.
///
/// A wrong passphrase is an answer, not an error: it comes back as
/// `Rejected`. Errors are reserved for a missing tool, an unreachable
/// service or a response that cannot be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// The vault is open. `persist_error` is set when the persistence
    /// hook failed; the session is kept regardless.
    Unlocked { persist_error: Option<String> },
    /// The store refused the credentials.
    Rejected { message: String },
    /// The first factor was accepted but a second factor is needed.
    MfaRequired { message: String },
}

impl AuthOutcome {
    pub fn is_unlocked(&self) -> bool {
        matches!(self, Self::Unlocked { .. })
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Unlocked { persist_error } => persist_error.as_deref(),
            Self::Rejected { message } | Self::MfaRequired { message } => Some(message),
        }
    }
}

pub struct SessionManager<I: Invoker> {
    settings: Settings,
    invoker: I,
    clock: Box<dyn Clock>,
    session: Session,
    folders: FolderCache,
}

impl<I: Invoker> SessionManager<I> {
    pub fn new(settings: Settings, invoker: I) -> Self {
        Self {
            settings,
            invoker,
            clock: Box::new(SystemClock),
            session: Session::default(),
            folders: FolderCache::new(),
        }
    }

    /// Replace the wall clock (tests drive expiry with a `ManualClock`).
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn invoker(&self) -> &I {
        &self.invoker
    }

    pub fn folders(&self) -> &FolderCache {
        &self.folders
    }

    pub fn store(&self) -> StoreKind {
        self.settings.store
    }

    /// When the idle session will be dropped, if a timeout is configured.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.session.expires_at
    }

    /// Whether the last login attempt asked for a second factor.
    pub fn mfa_required(&self) -> bool {
        self.session.mfa_required
    }

    /// The session token, for handing to another process.
    ///
    /// Always `None` for file stores, whose secret is the master passphrase.
    pub fn token(&self) -> Option<&str> {
        if self.store().session_via_stdin() {
            return None;
        }
        self.session.token.as_deref().map(String::as_str)
    }

    /// Whether a token is held and has not idled out.
    pub fn is_unlocked(&mut self) -> bool {
        self.expire_if_idle();
        self.session.token.is_some()
    }

    /// Search and detail lookups on this session.
    pub fn query(&mut self) -> QueryService<'_, I> {
        QueryService::new(self)
    }

    // ── Checks ───────────────────────────────────────────────────────

    /// Whether the account must log in before it can unlock.
    ///
    /// For file databases this only verifies that the tool runs and the
    /// database exists. A check that fails at the transport level counts
    /// as "login required".
    pub fn needs_login(&mut self) -> Result<bool> {
        self.expire_if_idle();

        if self.store().is_file_based() {
            self.check_database()?;
            return Ok(false);
        }

        if self.session.token.is_some() {
            return Ok(false);
        }

        match self.run(&StoreCommand::LoginCheck, None) {
            Ok(None | Some(CliOutcome::Success(_))) => Ok(false),
            Ok(Some(CliOutcome::ToolNotFound(target))) => Err(VaultError::ToolNotFound(target)),
            Ok(Some(outcome)) => {
                tracing::debug!(message = ?outcome.failure_message(), "login check failed");
                Ok(true)
            }
            Err(e @ (VaultError::Transport(_) | VaultError::CliError(_))) => {
                tracing::debug!(error = %e, "login check unreadable; assuming login is required");
                Ok(true)
            }
            Err(e) => Err(e),
        }
    }

    /// Whether the vault needs a passphrase before it can be queried.
    pub fn needs_unlock(&mut self) -> Result<bool> {
        self.expire_if_idle();

        if self.session.token.is_none() {
            return Ok(true);
        }

        match self.run_with_session(&StoreCommand::UnlockCheck)? {
            CliOutcome::Success(_) => Ok(false),
            CliOutcome::ToolNotFound(target) => Err(VaultError::ToolNotFound(target)),
            outcome => {
                tracing::info!(
                    message = ?outcome.failure_message(),
                    "session rejected by the credential store"
                );
                self.drop_session();
                Ok(true)
            }
        }
    }

    // ── Authentication ───────────────────────────────────────────────

    /// Log the configured account in.
    ///
    /// The attempt is made even when MFA is enabled and no code is given;
    /// the store's answer decides whether a second factor is needed.
    /// Stores without accounts treat this as `unlock`.
    pub fn login(&mut self, passphrase: &str, mfa_code: Option<&str>) -> Result<AuthOutcome> {
        if !self.store().has_accounts() {
            return self.unlock(passphrase);
        }

        if self.settings.account_id.is_empty() {
            return Err(VaultError::ConfigError(
                "account_id must be set before logging in (vaultsearch config set account-id <email>)"
                    .into(),
            ));
        }

        self.drop_session();

        let account = self.settings.account_id.clone();
        let outcome = self.run(
            &StoreCommand::Login {
                account: &account,
                mfa_code,
            },
            Some(passphrase),
        )?;
        self.finish_auth(outcome, passphrase, mfa_code.is_none())
    }

    /// Decrypt an already-authenticated vault.
    pub fn unlock(&mut self, passphrase: &str) -> Result<AuthOutcome> {
        if self.store().is_file_based() {
            self.check_database()?;
        }

        self.drop_session();

        let outcome = self.run(&StoreCommand::Unlock, Some(passphrase))?;
        self.finish_auth(outcome, passphrase, false)
    }

    /// Forget the token and lock the store.
    ///
    /// Idempotent. Returns `false` when the store reported a failure; the
    /// local session is gone either way.
    pub fn lock(&mut self) -> Result<bool> {
        let had_session = self.session.token.is_some();
        self.drop_session();

        match self.run(&StoreCommand::Lock, None)? {
            None | Some(CliOutcome::Success(_)) => {
                if had_session {
                    tracing::info!("vault locked");
                }
                Ok(true)
            }
            Some(CliOutcome::ToolNotFound(target)) => Err(VaultError::ToolNotFound(target)),
            Some(outcome) => {
                tracing::debug!(message = ?outcome.failure_message(), "lock reported a failure");
                Ok(false)
            }
        }
    }

    /// Forget the token and log the account out.
    ///
    /// "Not logged in" counts as success; any other failure is returned.
    pub fn logout(&mut self) -> Result<()> {
        self.drop_session();

        match self.run(&StoreCommand::Logout, None)? {
            None | Some(CliOutcome::Success(_)) => {
                tracing::info!("logged out");
                Ok(())
            }
            Some(outcome) if outcome.failure_contains(NOT_LOGGED_IN_MARKER) => Ok(()),
            Some(outcome) => outcome.into_payload().map(|_| ()),
        }
    }

    /// Pull remote changes and rebuild the folder cache.
    ///
    /// Returns `false` when the store reports a sync failure.
    pub fn sync(&mut self) -> Result<bool> {
        match self.run_with_session(&StoreCommand::Sync)? {
            CliOutcome::Success(_) => {
                match self.refresh_folders() {
                    Err(e) if e.is_locked() => return Err(e),
                    Err(e) => tracing::warn!(error = %e, "folder refresh after sync failed"),
                    Ok(()) => {}
                }
                tracing::info!("vault synced");
                Ok(true)
            }
            CliOutcome::ToolNotFound(target) => Err(VaultError::ToolNotFound(target)),
            outcome => {
                tracing::warn!(message = ?outcome.failure_message(), "sync failed");
                Ok(false)
            }
        }
    }

    /// Replace the folder cache with a fresh listing.
    ///
    /// On any failure the cache is emptied and the error returned.
    pub fn refresh_folders(&mut self) -> Result<()> {
        let listing = self
            .run_with_session(&StoreCommand::ListFolders)
            .and_then(CliOutcome::into_payload)
            .and_then(|payload| self.store().parse_folders(&payload));

        match listing {
            Ok(names) => {
                self.folders.replace(names);
                Ok(())
            }
            Err(e) => {
                self.folders.clear();
                Err(e)
            }
        }
    }

    /// Start from a token obtained elsewhere (e.g. `BW_SESSION`).
    ///
    /// The token is trusted until a call proves otherwise.
    pub fn adopt_token(&mut self, token: &str) {
        let token = token.trim();
        if token.is_empty() {
            return;
        }
        self.session.token = Some(Zeroizing::new(token.to_string()));
        self.session.mfa_required = false;
        self.touch();
        tracing::debug!("adopted session token from the environment");
    }

    // ── Configuration ────────────────────────────────────────────────

    /// Change one setting and invalidate what depends on it.
    ///
    /// A logout against the previous settings happens before the new
    /// value is applied; its failure is logged and does not stop the
    /// change. Returns the actions that were carried out.
    pub fn apply_config_change(&mut self, key: ConfigKey, value: &str) -> Result<Vec<Invalidation>> {
        let ConfigTransition { settings, actions } = transition(&self.settings, key, value)?;

        for action in &actions {
            match action {
                Invalidation::LogoutPrevious => {
                    if let Err(e) = self.logout() {
                        tracing::warn!(error = %e, key = %key, "logout before reconfiguration failed");
                    }
                }
                Invalidation::ClearSession => self.clear_session(),
                Invalidation::ClearFolders => self.folders.clear(),
                Invalidation::ConfigureServer(_) => {}
            }
        }

        self.settings = settings;

        for action in &actions {
            if let Invalidation::ConfigureServer(url) = action {
                self.configure_server(url);
            }
        }

        tracing::info!(key = %key, actions = actions.len(), "configuration changed");
        Ok(actions)
    }

    fn configure_server(&mut self, url: &str) {
        match self.run(&StoreCommand::ConfigServer { url }, None) {
            Ok(None | Some(CliOutcome::Success(_))) => {
                tracing::info!(url = url, "credential store pointed at new server");
            }
            Ok(Some(outcome)) => tracing::warn!(
                url = url,
                message = ?outcome.failure_message(),
                "credential store refused the new server"
            ),
            Err(e) => tracing::warn!(url = url, error = %e, "configuring the server failed"),
        }
    }

    // ── Invocation ───────────────────────────────────────────────────

    /// Run `cmd` without a session. `None` when the store has no such command.
    fn run(&self, cmd: &StoreCommand<'_>, stdin: Option<&str>) -> Result<Option<CliOutcome>> {
        let database = self.settings.database_path();
        let Some(args) = self.store().argv(cmd, database.as_deref())? else {
            return Ok(None);
        };
        CliOutcome::from_invocation(self.invoker.invoke(&args, stdin)).map(Some)
    }

    /// Run `cmd` with the current session.
    ///
    /// Fails with `VaultLocked` when there is no (unexpired) session, or
    /// when the store says the session is no longer valid; in that case
    /// the session is dropped first. A successful call pushes the
    /// inactivity deadline forward.
    pub(crate) fn run_with_session(&mut self, cmd: &StoreCommand<'_>) -> Result<CliOutcome> {
        self.expire_if_idle();

        let token = self.session.token.clone().ok_or(VaultError::VaultLocked)?;
        let database = self.settings.database_path();
        let Some(args) = self.store().argv(cmd, database.as_deref())? else {
            return Ok(CliOutcome::Success(Payload::Empty));
        };

        let mut args = Zeroizing::new(args);
        let stdin = if self.store().session_via_stdin() {
            Some(token.as_str())
        } else {
            args.push("--session".to_string());
            args.push(token.to_string());
            None
        };

        let outcome = CliOutcome::from_invocation(self.invoker.invoke(args.as_slice(), stdin))?;

        if outcome.is_success() {
            self.touch();
        } else if outcome.failure_contains(NOT_LOGGED_IN_MARKER)
            || outcome.failure_contains(VAULT_LOCKED_MARKER)
        {
            tracing::info!("credential store reports the vault locked; dropping session");
            self.drop_session();
            return Err(VaultError::VaultLocked);
        }

        Ok(outcome)
    }

    // ── Internals ────────────────────────────────────────────────────

    fn finish_auth(
        &mut self,
        outcome: Option<CliOutcome>,
        passphrase: &str,
        first_factor_only: bool,
    ) -> Result<AuthOutcome> {
        let outcome = outcome.ok_or_else(|| {
            VaultError::CommandFailed(format!("{} has no such authentication command", self.store()))
        })?;

        match outcome {
            CliOutcome::Success(payload) => {
                let token = if self.store().session_via_stdin() {
                    Some(passphrase.to_string())
                } else {
                    self.store().session_token(&payload)
                };
                let token = token.ok_or_else(|| {
                    VaultError::CliError("the credential store did not return a session token".into())
                })?;
                Ok(self.establish(Zeroizing::new(token)))
            }
            CliOutcome::ToolNotFound(target) => Err(VaultError::ToolNotFound(target)),
            failure => {
                let message = failure.failure_message().unwrap_or_default().to_string();
                if first_factor_only && MFA_MARKERS.iter().any(|m| failure.failure_contains(m)) {
                    tracing::info!("credential store asks for a second factor");
                    self.session.mfa_required = true;
                    return Ok(AuthOutcome::MfaRequired { message });
                }
                tracing::info!("credential store rejected the credentials");
                Ok(AuthOutcome::Rejected { message })
            }
        }
    }

    fn establish(&mut self, token: Zeroizing<String>) -> AuthOutcome {
        self.session.token = Some(token);
        self.session.mfa_required = false;
        self.touch();
        tracing::info!(store = %self.store(), "vault unlocked");

        let persist_error = self.persist_token();

        if self.settings.folder_refresh == FolderRefresh::OnUnlock {
            if let Err(e) = self.refresh_folders() {
                tracing::warn!(error = %e, "folder refresh after unlock failed");
            }
        }

        AuthOutcome::Unlocked { persist_error }
    }

    /// Pipe the token to the persistence hook, if one is configured.
    ///
    /// File stores are skipped: their "token" is the master passphrase.
    fn persist_token(&self) -> Option<String> {
        if self.store().session_via_stdin() {
            return None;
        }
        let command = self
            .settings
            .session_persist_command
            .as_deref()
            .filter(|c| !c.trim().is_empty())?;
        let token = self.session.token.as_ref()?;

        match persist::run_hook(command, token) {
            Ok(()) => {
                tracing::debug!("session token handed to persist command");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "session persist command failed");
                Some(e.to_string())
            }
        }
    }

    fn check_database(&self) -> Result<PathBuf> {
        if let Some(CliOutcome::ToolNotFound(target)) = self.run(&StoreCommand::LoginCheck, None)? {
            return Err(VaultError::ToolNotFound(target));
        }
        let path = self.settings.database_path().ok_or_else(|| {
            VaultError::ConfigError("database_path must be set when store = \"keepassxc\"".into())
        })?;
        if !path.is_file() {
            return Err(VaultError::DatabaseFileNotFound(path));
        }
        Ok(path)
    }

    /// Push the inactivity deadline to now + timeout.
    fn touch(&mut self) {
        self.session.expires_at = self
            .settings
            .inactivity_timeout()
            .map(|timeout| self.clock.now() + timeout);
    }

    fn expire_if_idle(&mut self) {
        let expired = match (&self.session.token, self.session.expires_at) {
            (Some(_), Some(deadline)) => self.clock.now() > deadline,
            _ => false,
        };
        if expired {
            tracing::info!("session idle past the inactivity timeout; locking");
            if let Err(e) = self.lock() {
                tracing::warn!(error = %e, "lock after inactivity failed");
            }
        }
    }

    fn clear_session(&mut self) {
        self.session = Session::default();
    }

    /// Session and folder cache go together.
    fn drop_session(&mut self) {
        self.clear_session();
        self.folders.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoker::mock::MockInvoker;
    use crate::invoker::RawOutput;
    use chrono::Duration;
    use tempfile::TempDir;

    const FOLDERS: &str = r#"{"success": true, "data": {"object": "list", "data": [
        {"object": "folder", "id": "f1", "name": "Work"},
        {"object": "folder", "id": "f2", "name": "Personal"},
        {"object": "folder", "id": null, "name": "No Folder"}
    ]}}"#;

    fn token_response(token: &str) -> RawOutput {
        RawOutput::stdout(format!(
            r#"{{"success": true, "data": {{"object": "message", "title": "Your vault is now unlocked!", "raw": "{token}"}}}}"#
        ))
    }

    fn bw_settings() -> Settings {
        Settings {
            account_id: "me@example.com".into(),
            ..Settings::default()
        }
    }

    fn manager(settings: Settings) -> (SessionManager<MockInvoker>, ManualClock) {
        let clock = ManualClock::default();
        let mock = MockInvoker::new();
        mock.respond(&["unlock", "--passwordfile"], token_response("tok"));
        mock.respond(&["list", "folders"], RawOutput::stdout(FOLDERS));
        let manager = SessionManager::new(settings, mock).with_clock(clock.clone());
        (manager, clock)
    }

    fn unlocked(settings: Settings) -> (SessionManager<MockInvoker>, ManualClock) {
        let (mut m, clock) = manager(settings);
        assert!(m.unlock("hunter2").unwrap().is_unlocked());
        m.invoker().clear_calls();
        (m, clock)
    }

    fn position(m: &SessionManager<MockInvoker>, prefix: &[&str]) -> Option<usize> {
        m.invoker().calls().iter().position(|c| c.starts_with(prefix))
    }

    #[test]
    fn unlock_pipes_passphrase_and_stores_token() {
        let (mut m, _) = manager(bw_settings());
        let outcome = m.unlock("hunter2").unwrap();
        assert_eq!(outcome, AuthOutcome::Unlocked { persist_error: None });
        assert!(m.is_unlocked());

        let calls = m.invoker().calls();
        assert_eq!(calls[0].stdin.as_deref(), Some("hunter2"));
        assert!(!calls[0].args.contains(&"hunter2".to_string()));

        let folders = calls.iter().find(|c| c.starts_with(&["list", "folders"])).unwrap();
        let pos = folders.args.iter().position(|a| a == "--session").unwrap();
        assert_eq!(folders.args[pos + 1], "tok");
    }

    #[test]
    fn unlock_refreshes_folder_cache() {
        let (m, _) = unlocked(bw_settings());
        assert_eq!(m.folders().lookup("f1"), "Work");
        assert_eq!(m.folders().lookup("f2"), "Personal");
        assert_eq!(m.folders().lookup("unknown"), "");
    }

    #[test]
    fn sync_only_policy_skips_refresh_on_unlock() {
        let settings = Settings {
            folder_refresh: FolderRefresh::SyncOnly,
            ..bw_settings()
        };
        let (mut m, _) = manager(settings);
        m.unlock("hunter2").unwrap();
        assert_eq!(m.invoker().calls_to(&["list", "folders"]), 0);
        assert!(m.folders().is_empty());

        assert!(m.sync().unwrap());
        assert_eq!(m.folders().lookup("f1"), "Work");
    }

    #[test]
    fn wrong_passphrase_is_rejected_not_locked() {
        let (mut m, _) = manager(bw_settings());
        m.invoker().respond(
            &["unlock", "--passwordfile"],
            RawOutput::stderr(r#"{"success": false, "message": "Invalid master password."}"#),
        );
        let outcome = m.unlock("wrong").unwrap();
        assert_eq!(
            outcome,
            AuthOutcome::Rejected {
                message: "Invalid master password.".into()
            }
        );
        assert!(!m.is_unlocked());
    }

    #[test]
    fn failed_unlock_clears_previous_token() {
        let (mut m, _) = unlocked(bw_settings());
        m.invoker().respond(
            &["unlock", "--passwordfile"],
            RawOutput::stderr("Invalid master password."),
        );
        assert!(!m.unlock("wrong").unwrap().is_unlocked());
        assert!(!m.is_unlocked());
        assert!(m.folders().is_empty());
    }

    #[test]
    fn idle_session_expires_on_next_check() {
        let settings = Settings {
            inactivity_timeout_secs: 60,
            ..bw_settings()
        };
        let (mut m, clock) = unlocked(settings);

        clock.advance(Duration::seconds(61));
        assert!(m.needs_unlock().unwrap());
        assert!(!m.is_unlocked());
        assert_eq!(m.invoker().calls_to(&["lock"]), 1);
        assert_eq!(m.invoker().calls_to(&["unlock", "--check"]), 0);
        assert!(m.folders().is_empty());
    }

    #[test]
    fn session_survives_exactly_the_timeout() {
        let settings = Settings {
            inactivity_timeout_secs: 60,
            ..bw_settings()
        };
        let (mut m, clock) = unlocked(settings);

        clock.advance(Duration::seconds(60));
        assert!(m.is_unlocked());
        assert_eq!(m.invoker().calls_to(&["lock"]), 0);

        clock.advance(Duration::seconds(1));
        assert!(!m.is_unlocked());
        assert_eq!(m.invoker().calls_to(&["lock"]), 1);
    }

    #[test]
    fn activity_pushes_deadline_forward() {
        let settings = Settings {
            inactivity_timeout_secs: 60,
            ..bw_settings()
        };
        let (mut m, clock) = unlocked(settings);
        m.invoker()
            .respond(&["list", "items"], RawOutput::stdout(r#"{"success": true, "data": []}"#));

        clock.advance(Duration::seconds(50));
        m.query().search("mail").unwrap();
        clock.advance(Duration::seconds(50));

        assert!(!m.needs_unlock().unwrap());
        assert!(m.is_unlocked());
    }

    #[test]
    fn failed_call_does_not_extend_deadline() {
        let settings = Settings {
            inactivity_timeout_secs: 60,
            ..bw_settings()
        };
        let (mut m, clock) = unlocked(settings);
        let deadline = m.expires_at().unwrap();
        m.invoker()
            .respond(&["get", "item"], RawOutput::stderr("Not found."));

        clock.advance(Duration::seconds(30));
        assert!(m.query().get_entry_details("nope").is_err());
        assert_eq!(m.expires_at(), Some(deadline));
    }

    #[test]
    fn no_timeout_means_no_deadline() {
        let (mut m, clock) = unlocked(bw_settings());
        assert_eq!(m.expires_at(), None);
        clock.advance(Duration::days(30));
        assert!(m.is_unlocked());
    }

    #[test]
    fn lock_is_idempotent() {
        let (mut m, _) = unlocked(bw_settings());
        assert!(m.lock().unwrap());
        assert!(m.lock().unwrap());
        assert!(!m.is_unlocked());
        assert!(m.folders().is_empty());
        assert_eq!(m.expires_at(), None);
    }

    #[test]
    fn not_logged_in_on_session_call_is_vault_locked() {
        let (mut m, _) = unlocked(bw_settings());
        m.invoker()
            .respond(&["list", "items"], RawOutput::stderr("You are not logged in."));

        let err = m.query().search("mail").unwrap_err();
        assert!(err.is_locked());
        assert!(!m.is_unlocked());

        m.invoker().clear_calls();
        assert!(m.needs_unlock().unwrap());
        assert!(m.invoker().calls().is_empty());
    }

    #[test]
    fn needs_unlock_raises_locked_when_check_reports_logged_out() {
        let (mut m, _) = unlocked(bw_settings());
        m.invoker().respond(
            &["unlock", "--check"],
            RawOutput::stdout(r#"{"success": false, "message": "You are not logged in."}"#),
        );
        assert!(m.needs_unlock().unwrap_err().is_locked());
        assert!(!m.is_unlocked());
    }

    #[test]
    fn needs_unlock_false_while_store_confirms() {
        let (mut m, _) = unlocked(bw_settings());
        m.invoker().respond(
            &["unlock", "--check"],
            RawOutput::stdout(r#"{"success": true, "data": {"title": "Vault is unlocked!"}}"#),
        );
        assert!(!m.needs_unlock().unwrap());
    }

    #[test]
    fn needs_login_follows_login_check() {
        let (mut m, _) = manager(bw_settings());
        m.invoker().respond(
            &["login", "--check"],
            RawOutput::stdout(r#"{"success": false, "message": "You are not logged in."}"#),
        );
        assert!(m.needs_login().unwrap());

        m.invoker().respond(
            &["login", "--check"],
            RawOutput::stdout(r#"{"success": true, "data": {"title": "You are logged in!"}}"#),
        );
        assert!(!m.needs_login().unwrap());
    }

    #[test]
    fn unreadable_login_check_means_login_required() {
        let (mut m, _) = manager(bw_settings());
        m.invoker()
            .respond(&["login", "--check"], RawOutput::stdout("{not json"));
        assert!(m.needs_login().unwrap());
    }

    #[test]
    fn missing_tool_is_raised() {
        let (mut m, _) = manager(bw_settings());
        m.invoker().set_missing(true);
        assert!(matches!(m.needs_login(), Err(VaultError::ToolNotFound(_))));
        assert!(matches!(m.unlock("pw"), Err(VaultError::ToolNotFound(_))));
        assert!(matches!(m.lock(), Err(VaultError::ToolNotFound(_))));
    }

    #[test]
    fn login_without_code_is_attempted_and_reports_mfa() {
        let settings = Settings {
            mfa_enabled: true,
            ..bw_settings()
        };
        let (mut m, _) = manager(settings);
        m.invoker().respond(
            &["login", "me@example.com"],
            RawOutput::stderr(r#"{"success": false, "message": "Two-step login code is required."}"#),
        );

        let outcome = m.login("hunter2", None).unwrap();
        assert!(matches!(outcome, AuthOutcome::MfaRequired { .. }));
        assert!(m.mfa_required());

        let calls = m.invoker().calls();
        assert_eq!(calls.len(), 1);
        assert!(!calls[0].args.contains(&"--code".to_string()));
        assert_eq!(calls[0].stdin.as_deref(), Some("hunter2"));
    }

    #[test]
    fn login_with_code_stores_token() {
        let (mut m, _) = manager(bw_settings());
        m.invoker().respond(&["login", "me@example.com"], token_response("logged-in"));

        let outcome = m.login("hunter2", Some("123456")).unwrap();
        assert!(outcome.is_unlocked());
        assert!(!m.mfa_required());

        let calls = m.invoker().calls();
        let login = &calls[0];
        let pos = login.args.iter().position(|a| a == "--code").unwrap();
        assert_eq!(login.args[pos + 1], "123456");

        let folders = m
            .invoker()
            .calls()
            .into_iter()
            .find(|c| c.starts_with(&["list", "folders"]))
            .unwrap();
        assert!(folders.args.contains(&"logged-in".to_string()));
    }

    #[test]
    fn wrong_code_is_rejected() {
        let (mut m, _) = manager(bw_settings());
        m.invoker().respond(
            &["login", "me@example.com"],
            RawOutput::stderr(r#"{"success": false, "message": "Two-step token is invalid. Try again."}"#),
        );
        let outcome = m.login("hunter2", Some("000000")).unwrap();
        assert!(matches!(outcome, AuthOutcome::Rejected { .. }));
    }

    #[test]
    fn login_requires_account() {
        let (mut m, _) = manager(Settings::default());
        assert!(matches!(
            m.login("pw", None),
            Err(VaultError::ConfigError(_))
        ));
    }

    #[test]
    fn logout_tolerates_already_logged_out() {
        let (mut m, _) = unlocked(bw_settings());
        m.invoker()
            .respond(&["logout"], RawOutput::stderr("You are not logged in."));
        m.logout().unwrap();
        assert!(!m.is_unlocked());
    }

    #[test]
    fn logout_propagates_other_failures() {
        let (mut m, _) = unlocked(bw_settings());
        m.invoker()
            .respond(&["logout"], RawOutput::stderr("Network request failed"));
        let err = m.logout().unwrap_err();
        assert_eq!(err.to_string(), "Network request failed");
        assert!(!m.is_unlocked());
    }

    #[test]
    fn sync_failure_returns_false() {
        let (mut m, _) = unlocked(bw_settings());
        m.invoker()
            .respond(&["sync"], RawOutput::stdout(r#"{"success": false, "message": "Sync failed."}"#));
        assert!(!m.sync().unwrap());
        assert!(m.is_unlocked());
    }

    #[test]
    fn sync_without_session_is_locked() {
        let (mut m, _) = manager(bw_settings());
        assert!(m.sync().unwrap_err().is_locked());
        assert!(m.invoker().calls().is_empty());
    }

    #[test]
    fn failed_folder_refresh_empties_cache() {
        let (mut m, _) = unlocked(bw_settings());
        assert!(!m.folders().is_empty());
        m.invoker()
            .respond(&["list", "folders"], RawOutput::stderr("Something broke."));
        assert!(m.refresh_folders().is_err());
        assert!(m.folders().is_empty());
    }

    #[test]
    fn server_url_change_logs_out_before_applying() {
        let settings = Settings {
            inactivity_timeout_secs: 300,
            ..bw_settings()
        };
        let (mut m, _) = unlocked(settings);
        assert!(m.expires_at().is_some());

        let actions = m
            .apply_config_change(ConfigKey::ServerUrl, "https://vault.example.com")
            .unwrap();
        assert_eq!(actions[0], Invalidation::LogoutPrevious);

        let logout = position(&m, &["logout"]).unwrap();
        let config = position(&m, &["config", "server", "https://vault.example.com"]).unwrap();
        assert!(logout < config);
        assert_eq!(m.settings().server_url, "https://vault.example.com");
        assert_eq!(m.expires_at(), None);
        assert!(!m.is_unlocked());
        assert!(m.folders().is_empty());
    }

    #[test]
    fn failed_logout_does_not_block_server_change() {
        let settings = Settings {
            inactivity_timeout_secs: 300,
            ..bw_settings()
        };
        let (mut m, _) = unlocked(settings);
        m.invoker()
            .respond(&["logout"], RawOutput::stderr("Network request failed"));

        m.apply_config_change(ConfigKey::ServerUrl, "https://vault.example.com")
            .unwrap();
        assert_eq!(m.settings().server_url, "https://vault.example.com");
        assert_eq!(m.expires_at(), None);
        assert!(!m.is_unlocked());
    }

    #[test]
    fn timeout_change_clears_session_without_logout() {
        let (mut m, _) = unlocked(bw_settings());
        assert_eq!(m.folders().lookup("f1"), "Work");
        m.apply_config_change(ConfigKey::InactivityTimeout, "90").unwrap();
        assert!(!m.is_unlocked());
        assert!(m.folders().is_empty());
        assert_eq!(m.folders().lookup("f1"), "");
        assert_eq!(m.invoker().calls_to(&["logout"]), 0);
        assert_eq!(m.settings().inactivity_timeout_secs, 90);
    }

    #[test]
    fn display_setting_keeps_session() {
        let (mut m, _) = unlocked(bw_settings());
        let actions = m.apply_config_change(ConfigKey::MaxResultItems, "5").unwrap();
        assert!(actions.is_empty());
        assert!(m.is_unlocked());
        assert!(m.invoker().calls().is_empty());
    }

    #[test]
    fn adopted_token_is_used_for_queries() {
        let (mut m, _) = manager(bw_settings());
        m.adopt_token("from-env\n");
        m.invoker()
            .respond(&["list", "items"], RawOutput::stdout(r#"{"success": true, "data": []}"#));
        m.query().search("mail").unwrap();
        let calls = m.invoker().calls();
        let call = &calls[0];
        assert!(call.args.contains(&"from-env".to_string()));
    }

    #[test]
    fn persist_hook_receives_token() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("session");
        let settings = Settings {
            session_persist_command: Some(format!("cat > '{}'", out.display())),
            ..bw_settings()
        };
        let (mut m, _) = manager(settings);
        assert_eq!(
            m.unlock("hunter2").unwrap(),
            AuthOutcome::Unlocked { persist_error: None }
        );
        assert_eq!(std::fs::read_to_string(out).unwrap(), "tok");
    }

    #[test]
    fn failing_persist_hook_keeps_session() {
        let settings = Settings {
            session_persist_command: Some("exit 7".into()),
            ..bw_settings()
        };
        let (mut m, _) = manager(settings);
        let outcome = m.unlock("hunter2").unwrap();
        assert!(outcome.is_unlocked());
        assert!(outcome.message().unwrap().contains("status 7"));
        assert!(m.is_unlocked());
    }

    // ── KeePassXC ────────────────────────────────────────────────────

    fn keepass(tmp: &TempDir) -> (SessionManager<MockInvoker>, String) {
        let db = tmp.path().join("vault.kdbx");
        std::fs::write(&db, b"kdbx").unwrap();
        let db = db.display().to_string();
        let settings = Settings {
            store: StoreKind::Keepassxc,
            database_path: Some(db.clone()),
            ..Settings::default()
        };
        let mock = MockInvoker::new();
        mock.respond(&["ls", "-q", "-R"], RawOutput::stdout("Work/\nWork/GitHub\n"));
        (SessionManager::new(settings, mock), db)
    }

    #[test]
    fn keepass_unlock_keeps_passphrase_as_session() {
        let tmp = TempDir::new().unwrap();
        let (mut m, db) = keepass(&tmp);
        m.invoker()
            .respond(&["ls", "-q", db.as_str()], RawOutput::stdout("Work/\n"));

        assert!(m.unlock("hunter2").unwrap().is_unlocked());
        assert_eq!(m.folders().lookup("Work"), "Work");

        m.invoker().respond(&["locate"], RawOutput::stdout("/Work/GitHub\n"));
        m.invoker().clear_calls();
        let hits = m.query().search("git").unwrap();
        assert_eq!(hits[0].name, "GitHub");

        let calls = m.invoker().calls();
        let call = &calls[0];
        assert_eq!(call.stdin.as_deref(), Some("hunter2"));
        assert!(!call.args.contains(&"--session".to_string()));
    }

    #[test]
    fn keepass_needs_no_login_but_needs_database() {
        let tmp = TempDir::new().unwrap();
        let (mut m, db) = keepass(&tmp);
        assert!(!m.needs_login().unwrap());

        std::fs::remove_file(&db).unwrap();
        assert!(matches!(
            m.needs_login(),
            Err(VaultError::DatabaseFileNotFound(_))
        ));
    }

    #[test]
    fn keepass_wrong_passphrase_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let (mut m, db) = keepass(&tmp);
        m.invoker().respond(
            &["ls", "-q", db.as_str()],
            RawOutput::stderr("Error while reading the database: Invalid credentials were provided"),
        );
        assert!(matches!(
            m.unlock("nope").unwrap(),
            AuthOutcome::Rejected { .. }
        ));
    }

    #[test]
    fn keepass_lock_is_local() {
        let tmp = TempDir::new().unwrap();
        let (mut m, db) = keepass(&tmp);
        m.invoker()
            .respond(&["ls", "-q", db.as_str()], RawOutput::stdout(""));
        m.unlock("hunter2").unwrap();
        m.invoker().clear_calls();

        assert!(m.lock().unwrap());
        assert!(m.invoker().calls().is_empty());
        assert!(!m.is_unlocked());
    }
}
