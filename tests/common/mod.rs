//! A fake `bw` for integration tests.
//!
//! The script keeps its lock state in a directory (`FAKE_BW_STATE`) and
//! appends every argument vector to `calls`, so tests can drive the real
//! process invoker end-to-end and inspect what was sent.

#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

pub const PASSWORD: &str = "hunter2";
pub const TOKEN: &str = "tok-1";

const SCRIPT: &str = r#"#!/bin/sh
state="$FAKE_BW_STATE"
echo "$*" >> "$state/calls"

session=""
prev=""
for a in "$@"; do
  [ "$prev" = "--session" ] && session="$a"
  prev="$a"
done

require_session() {
  if [ "$session" != "tok-1" ] || [ ! -f "$state/unlocked" ]; then
    echo "Vault is locked." >&2
    exit 1
  fi
}

case "$1 $2" in
  "login --check")
    echo '{"success":true,"data":{"object":"message","title":"You are logged in!"}}'
    ;;
  "unlock --check")
    require_session
    echo '{"success":true,"data":{"object":"message","title":"Vault is unlocked!"}}'
    ;;
  "unlock --passwordfile")
    pw=$(cat)
    if [ "$pw" = "hunter2" ]; then
      touch "$state/unlocked"
      echo '{"success":true,"data":{"object":"message","title":"Your vault is now unlocked!","raw":"tok-1"}}'
    else
      echo '{"success":false,"message":"Invalid master password."}' >&2
      exit 1
    fi
    ;;
  "lock "*)
    rm -f "$state/unlocked"
    echo '{"success":true,"data":{"object":"message","title":"Your vault is locked."}}'
    ;;
  "logout "*)
    rm -f "$state/unlocked"
    echo '{"success":true,"data":{"object":"message","title":"You have logged out."}}'
    ;;
  "config server")
    echo "$3" > "$state/server"
    echo '{"success":true,"data":{"object":"message","title":"Saved setting `config`."}}'
    ;;
  "sync "*)
    require_session
    echo '{"success":true,"data":{"object":"message","title":"Syncing complete."}}'
    ;;
  "list folders")
    require_session
    echo '{"success":true,"data":{"object":"list","data":[{"object":"folder","id":"f1","name":"Work"},{"object":"folder","id":null,"name":"No Folder"}]}}'
    ;;
  "list items")
    require_session
    if [ "$4" = "zz" ]; then
      echo "No results for that search." >&2
      exit 1
    fi
    echo '{"success":true,"data":{"object":"list","data":[{"object":"item","id":"i1","name":"GitHub","folderId":"f1"},{"object":"item","id":"i2","name":"GitLab","folderId":null}]}}'
    ;;
  "get item")
    require_session
    echo '{"success":true,"data":{"object":"item","id":"i1","name":"GitHub","login":{"username":"octocat","password":"p4ss","totp":"otpauth://totp/x?secret=JBSWY3DP","uris":[{"uri":"https://github.com"}]}}}'
    ;;
  "get totp")
    require_session
    echo '{"success":true,"data":{"object":"string","data":"492039"}}'
    ;;
  *)
    echo "unknown command: $*" >&2
    exit 1
    ;;
esac
"#;

/// A fake store: the script, its state directory, and the temp dir holding both.
pub struct FakeBw {
    pub dir: TempDir,
    pub script: PathBuf,
    pub state: PathBuf,
}

impl FakeBw {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("create temp dir");
        let state = dir.path().join("state");
        fs::create_dir(&state).expect("create state dir");

        let script = dir.path().join("bw");
        fs::write(&script, SCRIPT).expect("write fake bw");
        let mut perms = fs::metadata(&script).expect("stat fake bw").permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&script, perms).expect("chmod fake bw");

        Self { dir, script, state }
    }

    pub fn calls(&self) -> String {
        fs::read_to_string(self.state.join("calls")).unwrap_or_default()
    }

    pub fn is_unlocked(&self) -> bool {
        self.state.join("unlocked").exists()
    }

    /// Simulate another process locking the vault.
    pub fn lock_externally(&self) {
        let _ = fs::remove_file(self.state.join("unlocked"));
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}
