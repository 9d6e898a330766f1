//! Scan wizard state machine
//!
//! A scan wizard walks the daemon's guided pairing flow: scan until a button
//! shows up, connect to it, verify it, and report the result. It tracks at
//! most one candidate button at a time.

use flicd_protocol::{BdAddr, Name, ScanWizardResult};

use super::TransitionError;

/// Scan wizard phases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardPhase {
    /// Looking for buttons
    Scanning,
    /// Saw a private button; the user must hold it to make it public
    FoundPrivate,
    /// Found a public button, daemon is connecting to it
    Connecting,
    /// Connected, daemon is verifying the button
    Verifying,
    /// Done; terminal
    Completed,
}

impl WizardPhase {
    pub fn name(self) -> &'static str {
        match self {
            WizardPhase::Scanning => "Scanning",
            WizardPhase::FoundPrivate => "FoundPrivate",
            WizardPhase::Connecting => "Connecting",
            WizardPhase::Verifying => "Verifying",
            WizardPhase::Completed => "Completed",
        }
    }

    pub fn is_terminal(self) -> bool {
        self == WizardPhase::Completed
    }
}

/// Inputs driving a scan wizard
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardInput {
    FoundPrivateButton,
    FoundPublicButton { bd_addr: BdAddr, name: Name },
    ButtonConnected,
    Completed { result: ScanWizardResult },
}

impl WizardInput {
    pub fn name(&self) -> &'static str {
        match self {
            WizardInput::FoundPrivateButton => "found private button",
            WizardInput::FoundPublicButton { .. } => "found public button",
            WizardInput::ButtonConnected => "button connected",
            WizardInput::Completed { .. } => "completed",
        }
    }
}

/// What the application should be told after an input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardNotification {
    FoundPrivateButton,
    FoundPublicButton {
        bd_addr: BdAddr,
        name: Name,
    },
    ButtonConnected {
        bd_addr: BdAddr,
        name: Name,
    },
    Completed {
        result: ScanWizardResult,
        bd_addr: Option<BdAddr>,
        name: Option<Name>,
    },
    /// Input accepted without anything to report
    Nothing,
}

/// Client-side record of one scan wizard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WizardMachine {
    phase: WizardPhase,
    candidate: Option<(BdAddr, Name)>,
}

impl Default for WizardMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl WizardMachine {
    pub fn new() -> Self {
        Self {
            phase: WizardPhase::Scanning,
            candidate: None,
        }
    }

    pub fn phase(&self) -> WizardPhase {
        self.phase
    }

    /// Button currently being connected or verified
    pub fn candidate(&self) -> Option<(BdAddr, &Name)> {
        self.candidate.as_ref().map(|(addr, name)| (*addr, name))
    }

    /// Apply an input and return what to notify
    ///
    /// On error the record is left untouched.
    pub fn apply(&mut self, input: WizardInput) -> Result<WizardNotification, TransitionError> {
        use WizardPhase::*;

        let reject = |phase: WizardPhase, input: &WizardInput| TransitionError {
            machine: "scan wizard",
            state: phase.name(),
            input: input.name(),
        };

        let notification = match (self.phase, input) {
            (Completed, input) => return Err(reject(Completed, &input)),

            (_, WizardInput::FoundPrivateButton) => {
                // Daemon went back to scanning; any candidate is gone
                self.candidate = None;
                self.phase = FoundPrivate;
                WizardNotification::FoundPrivateButton
            }

            // In Connecting the daemon has given up on the previous candidate
            (
                Scanning | FoundPrivate | Connecting,
                WizardInput::FoundPublicButton { bd_addr, name },
            ) => {
                self.candidate = Some((bd_addr, name.clone()));
                self.phase = Connecting;
                WizardNotification::FoundPublicButton { bd_addr, name }
            }
            (Verifying, WizardInput::FoundPublicButton { .. }) => WizardNotification::Nothing,

            (Connecting, WizardInput::ButtonConnected) => match &self.candidate {
                Some((bd_addr, name)) => {
                    let notification = WizardNotification::ButtonConnected {
                        bd_addr: *bd_addr,
                        name: name.clone(),
                    };
                    self.phase = Verifying;
                    notification
                }
                None => return Err(reject(Connecting, &WizardInput::ButtonConnected)),
            },
            (phase, input @ WizardInput::ButtonConnected) => return Err(reject(phase, &input)),

            (_, WizardInput::Completed { result }) => {
                let candidate = self.candidate.take();
                self.phase = Completed;
                WizardNotification::Completed {
                    result,
                    bd_addr: candidate.as_ref().map(|(addr, _)| *addr),
                    name: candidate.map(|(_, name)| name),
                }
            }
        };
        Ok(notification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr() -> BdAddr {
        "aa:bb:cc:dd:ee:ff".parse().unwrap()
    }

    fn name(text: &str) -> Name {
        let mut n = Name::new();
        n.push_str(text).unwrap();
        n
    }

    fn found_public(text: &str) -> WizardInput {
        WizardInput::FoundPublicButton {
            bd_addr: addr(),
            name: name(text),
        }
    }

    #[test]
    fn test_full_pairing_flow() {
        let mut wiz = WizardMachine::new();
        assert_eq!(wiz.phase(), WizardPhase::Scanning);

        assert_eq!(
            wiz.apply(WizardInput::FoundPrivateButton),
            Ok(WizardNotification::FoundPrivateButton)
        );
        assert_eq!(wiz.phase(), WizardPhase::FoundPrivate);

        assert_eq!(
            wiz.apply(found_public("F030")),
            Ok(WizardNotification::FoundPublicButton {
                bd_addr: addr(),
                name: name("F030")
            })
        );
        assert_eq!(wiz.phase(), WizardPhase::Connecting);

        assert_eq!(
            wiz.apply(WizardInput::ButtonConnected),
            Ok(WizardNotification::ButtonConnected {
                bd_addr: addr(),
                name: name("F030")
            })
        );
        assert_eq!(wiz.phase(), WizardPhase::Verifying);

        assert_eq!(
            wiz.apply(WizardInput::Completed {
                result: ScanWizardResult::WizardSuccess
            }),
            Ok(WizardNotification::Completed {
                result: ScanWizardResult::WizardSuccess,
                bd_addr: Some(addr()),
                name: Some(name("F030")),
            })
        );
        assert!(wiz.phase().is_terminal());
    }

    #[test]
    fn test_repeated_found_private_renotifies() {
        let mut wiz = WizardMachine::new();
        wiz.apply(WizardInput::FoundPrivateButton).unwrap();
        assert_eq!(
            wiz.apply(WizardInput::FoundPrivateButton),
            Ok(WizardNotification::FoundPrivateButton)
        );
    }

    #[test]
    fn test_new_candidate_replaces_abandoned_one() {
        let other: BdAddr = "01:02:03:04:05:06".parse().unwrap();
        let mut wiz = WizardMachine::new();
        wiz.apply(found_public("first")).unwrap();

        assert_eq!(
            wiz.apply(WizardInput::FoundPublicButton {
                bd_addr: other,
                name: name("second"),
            }),
            Ok(WizardNotification::FoundPublicButton {
                bd_addr: other,
                name: name("second"),
            })
        );
        assert_eq!(wiz.phase(), WizardPhase::Connecting);
        assert_eq!(
            wiz.apply(WizardInput::ButtonConnected),
            Ok(WizardNotification::ButtonConnected {
                bd_addr: other,
                name: name("second"),
            })
        );
    }

    #[test]
    fn test_found_public_ignored_while_verifying() {
        let mut wiz = WizardMachine::new();
        wiz.apply(found_public("first")).unwrap();
        wiz.apply(WizardInput::ButtonConnected).unwrap();

        assert_eq!(wiz.apply(found_public("second")), Ok(WizardNotification::Nothing));
        assert_eq!(wiz.phase(), WizardPhase::Verifying);
        assert_eq!(wiz.candidate().map(|(_, n)| n.as_str()), Some("first"));
    }

    #[test]
    fn test_found_private_drops_candidate() {
        let mut wiz = WizardMachine::new();
        wiz.apply(found_public("F030")).unwrap();
        wiz.apply(WizardInput::FoundPrivateButton).unwrap();

        assert_eq!(wiz.candidate(), None);
        assert_eq!(wiz.phase(), WizardPhase::FoundPrivate);
    }

    #[test]
    fn test_button_connected_without_candidate() {
        let mut wiz = WizardMachine::new();
        let err = wiz.apply(WizardInput::ButtonConnected).unwrap_err();
        assert_eq!(err.state, "Scanning");
        assert_eq!(wiz.phase(), WizardPhase::Scanning);
    }

    #[test]
    fn test_completed_without_candidate() {
        let mut wiz = WizardMachine::new();
        assert_eq!(
            wiz.apply(WizardInput::Completed {
                result: ScanWizardResult::WizardCancelledByUser
            }),
            Ok(WizardNotification::Completed {
                result: ScanWizardResult::WizardCancelledByUser,
                bd_addr: None,
                name: None,
            })
        );
    }

    #[test]
    fn test_nothing_after_completion() {
        let mut wiz = WizardMachine::new();
        wiz.apply(WizardInput::Completed {
            result: ScanWizardResult::WizardFailedTimeout,
        })
        .unwrap();
        assert!(wiz.apply(WizardInput::FoundPrivateButton).is_err());
    }
}
