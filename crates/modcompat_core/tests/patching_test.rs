use modcompat_core::patching::{PatchInstaller, PatchOutcome};
use modcompat_core::{
    GamePatcher, LogLevel, PatchDescriptor, PatchError, PatchFacade, PatchState, RecordingMonitor,
};

/// Installer that fails on one named patch and records the rest.
struct ScriptedInstaller {
    fail_on: &'static str,
    installed: Vec<String>,
}

impl PatchInstaller for ScriptedInstaller {
    fn install(&mut self, patch: &PatchDescriptor) -> Result<(), PatchError> {
        if patch.name == self.fail_on {
            return Err(PatchError::TargetNotFound {
                patch: patch.name.clone(),
                target: patch.target.clone(),
            });
        }
        self.installed.push(patch.name.clone());
        Ok(())
    }
}

fn loader_patches() -> Vec<PatchDescriptor> {
    vec![
        PatchDescriptor::new("DialogueErrorPatch", "StardewValley.Dialogue::parseDialogueString")
            .with_finalizer("DialogueErrorPatch.Finalize"),
        PatchDescriptor::new("EventErrorPatch", "StardewValley.GameLocation::checkEventPrecondition")
            .with_prefix("EventErrorPatch.Before"),
        PatchDescriptor::new("LoadContextPatch", "StardewValley.Game1::loadForNewGame")
            .with_prefix("LoadContextPatch.Before")
            .with_postfix("LoadContextPatch.After"),
    ]
}

#[test]
fn first_failure_disables_patching_and_skips_the_rest() {
    let monitor = RecordingMonitor::new();
    let state = PatchState::new();
    let patcher = GamePatcher::new(&monitor, state.clone());
    let mut installer = ScriptedInstaller {
        fail_on: "EventErrorPatch",
        installed: Vec::new(),
    };

    let summary = patcher.apply(&mut installer, &loader_patches());

    assert_eq!(installer.installed, vec!["DialogueErrorPatch".to_string()]);
    assert_eq!(summary.outcome_of("DialogueErrorPatch"), Some(PatchOutcome::Applied));
    assert_eq!(summary.outcome_of("EventErrorPatch"), Some(PatchOutcome::Failed));
    assert_eq!(summary.outcome_of("LoadContextPatch"), Some(PatchOutcome::Skipped));
    assert!(!state.is_enabled());
    assert!(!patcher.state().is_enabled());

    let entries = monitor.entries();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].level, LogLevel::Error);
    assert!(entries[0]
        .message
        .contains("Couldn't apply runtime patch 'EventErrorPatch'"));
    assert_eq!(entries[1].level, LogLevel::Trace);
    assert!(entries[1].message.contains("checkEventPrecondition"));
}

#[test]
fn invalid_descriptor_counts_as_a_failure() {
    let monitor = RecordingMonitor::new();
    let patcher = GamePatcher::new(&monitor, PatchState::new());
    let mut installer = ScriptedInstaller {
        fail_on: "",
        installed: Vec::new(),
    };
    let patches = vec![
        PatchDescriptor::new("NoHooks", "StardewValley.Game1::Update"),
        PatchDescriptor::new("Later", "StardewValley.Game1::Draw").with_postfix("Later.After"),
    ];

    let summary = patcher.apply(&mut installer, &patches);

    assert_eq!(summary.count(PatchOutcome::Failed), 1);
    assert_eq!(summary.count(PatchOutcome::Skipped), 1);
    assert!(installer.installed.is_empty());
}

#[test]
fn mod_patch_requests_are_dropped_once_patching_is_disabled() {
    let monitor = RecordingMonitor::new();
    let state = PatchState::new();
    let patcher = GamePatcher::new(&monitor, state.clone());
    let facade = PatchFacade::new(state);
    let mut installer = ScriptedInstaller {
        fail_on: "DialogueErrorPatch",
        installed: Vec::new(),
    };

    patcher.apply(&mut installer, &loader_patches());

    let mod_patch = PatchDescriptor::new("ModPatch", "StardewValley.Farmer::gainExperience")
        .with_postfix("ModPatch.After")
        .declared_in("SomeMod");
    assert!(facade.patch(&mut installer, &mod_patch).is_none());
    assert!(facade
        .patch_all_in_assembly(&mut installer, &[mod_patch], "SomeMod")
        .is_none());
    assert!(installer.installed.is_empty());
}
