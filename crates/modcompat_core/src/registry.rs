//! Ordered handler registry.
//!
//! # Responsibility
//! - Hold the handlers a scan runs, in the order they run.
//! - Build the standard handler set for a scan config and host epoch.
//!
//! # Invariants
//! - Handler names are unique.
//! - Handlers are ordered by phase: every rewrite runs before any detection
//!   on the same instruction.
//! - Facade tables are derived once here and never change during scans.

use crate::config::ScanConfig;
use crate::epoch::HostVersion;
use crate::facade::FacadeTable;
use crate::handler::finders::{
    EventFinder, FieldFinder, ReferenceToMemberWithUnexpectedTypeFinder,
    ReferenceToMissingMemberFinder, TypeFinder,
};
use crate::handler::rewriters::{
    FieldReplaceRewriter, FieldToPropertyRewriter, MethodParentRewriter,
    StaticFieldToConstantRewriter, TypeFieldToAnotherTypeFieldRewriter, TypeReferenceRewriter,
};
use crate::handler::{HandlerPhase, HandlerResult, InstructionHandler};
use crate::model::types::{TypeParseError, TypeRef};
use crate::symbols::SymbolTable;
use log::debug;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

const FACADE_NAMESPACE: &str = "StardewModdingAPI.Framework.RewriteFacades";

/// Facades applied only to modules built for another platform family.
const PLATFORM_FACADES: &[(&str, &str)] =
    &[("Microsoft.Xna.Framework.Graphics.SpriteBatch", "SpriteBatchMethods")];

/// Method and constructor facades for the current host version.
const VERSION_FACADES: &[(&str, &str)] = &[
    ("StardewValley.Game1", "Game1Methods"),
    ("StardewValley.Farmer", "FarmerMethods"),
    ("StardewValley.Menus.IClickableMenu", "IClickableMenuMethods"),
    ("StardewValley.FarmerRenderer", "FarmerRendererMethods"),
    ("StardewValley.HUDMessage", "HUDMessageMethods"),
    ("StardewValley.Menus.MapPage", "MapPageMethods"),
    ("StardewValley.Menus.TextBox", "TextBoxMethods"),
    ("HarmonyLib.Harmony", "HarmonyInstanceMethods"),
];

/// `(original type, original instance method, facade method)` renames.
const FACADE_ALIASES: &[(&str, &str, &str)] =
    &[("HarmonyLib.Harmony", "PatchAll", "PatchAllToAssembly")];

/// Host version the field and type reshaping rules target.
const RESHAPED_HOST_VERSION: HostVersion = HostVersion::new(1, 3, 0);

const FIELDS_TO_PROPERTIES: &[(&str, &str)] = &[
    ("StardewValley.Game1", "player"),
    ("StardewValley.Game1", "currentLocation"),
    ("StardewValley.Character", "currentLocation"),
    ("StardewValley.Farmer", "currentLocation"),
    ("StardewValley.Game1", "gameMode"),
    ("StardewValley.Game1", "currentMinigame"),
    ("StardewValley.Game1", "activeClickableMenu"),
    ("StardewValley.Game1", "stats"),
];

/// `(old owner, new owner, field, static accessor)`.
const FIELDS_TO_SINGLETONS: &[(&str, &str, &str, &str)] = &[
    ("StardewValley.Game1", "StardewValley.RainManager", "isRaining", "Instance"),
    (
        "StardewValley.Game1",
        "StardewValley.WeatherDebrisManager",
        "isDebrisWeather",
        "Instance",
    ),
];

const MENU_LIST_SIGNATURE: &str =
    "System.Collections.Generic.IList`1<StardewValley.Menus.IClickableMenu>";

const SAVE_SERIALIZER_FIELDS: &[&str] = &["serializer", "farmerSerializer", "locationSerializer"];

const FILESYSTEM_TYPES: &[&str] = &[
    "System.IO.File",
    "System.IO.FileStream",
    "System.IO.FileInfo",
    "System.IO.Directory",
    "System.IO.DirectoryInfo",
    "System.IO.DriveInfo",
    "System.IO.FileSystemWatcher",
];

/// Registry construction errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    DuplicateHandler(String),
    PhaseOrder {
        handler: String,
        phase: HandlerPhase,
        after: HandlerPhase,
    },
    InvalidSignature(TypeParseError),
}

impl Display for RegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateHandler(name) => write!(f, "handler registered twice: {name}"),
            Self::PhaseOrder {
                handler,
                phase,
                after,
            } => write!(
                f,
                "handler {handler} in phase {phase} cannot run after phase {after}"
            ),
            Self::InvalidSignature(err) => write!(f, "invalid rewrite signature: {err}"),
        }
    }
}

impl Error for RegistryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidSignature(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TypeParseError> for RegistryError {
    fn from(value: TypeParseError) -> Self {
        Self::InvalidSignature(value)
    }
}

/// Ordered set of instruction handlers.
#[derive(Default)]
pub struct InstructionRegistry {
    handlers: Vec<Box<dyn InstructionHandler>>,
    names: BTreeSet<String>,
}

impl InstructionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one handler.
    ///
    /// # Errors
    /// - Returns an error when a handler with the same name is registered.
    /// - Returns an error when the handler's phase precedes the phase of the
    ///   last registered handler.
    pub fn register(
        &mut self,
        handler: impl InstructionHandler + 'static,
    ) -> Result<(), RegistryError> {
        let name = handler.name().to_string();
        if self.names.contains(name.as_str()) {
            return Err(RegistryError::DuplicateHandler(name));
        }
        if let Some(last) = self.handlers.last() {
            if handler.phase() < last.phase() {
                return Err(RegistryError::PhaseOrder {
                    handler: name,
                    phase: handler.phase(),
                    after: last.phase(),
                });
            }
        }

        self.names.insert(name);
        self.handlers.push(Box::new(handler));
        Ok(())
    }

    pub fn handlers(&self) -> &[Box<dyn InstructionHandler>] {
        &self.handlers
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Handler names in run order.
    pub fn names(&self) -> Vec<&str> {
        self.handlers.iter().map(|handler| handler.name()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Standard handler set for `config`, with facades resolved in `symbols`.
    pub fn standard(config: &ScanConfig, symbols: &SymbolTable) -> Result<Self, RegistryError> {
        let mut registry = Self::new();

        for (original, facade) in PLATFORM_FACADES {
            if let Some(table) = facade_table(symbols, original, facade) {
                registry.register(MethodParentRewriter::new(table, true))?;
            }
        }

        for (original, facade) in VERSION_FACADES {
            if let Some(table) = facade_table(symbols, original, facade) {
                registry.register(MethodParentRewriter::new(table, false))?;
            }
        }

        registry.register(FieldReplaceRewriter::new(
            "StardewValley.Menus.ItemGrabMenu",
            "context",
            "specialObject",
        ))?;
        if config.epoch.is_at_least(RESHAPED_HOST_VERSION) {
            registry.register_reshaping_rules()?;
        }

        registry.register(ReferenceToMissingMemberFinder::new(
            config.trusted_assemblies.iter().cloned(),
        ))?;
        registry.register(ReferenceToMemberWithUnexpectedTypeFinder::new(
            config.trusted_assemblies.iter().cloned(),
        ))?;

        registry.register_stability_finders(config.strict_api)?;

        if config.is_heightened() {
            for type_name in FILESYSTEM_TYPES {
                registry.register(TypeFinder::new(
                    *type_name,
                    HandlerResult::DetectedFilesystemAccess,
                ))?;
            }
            registry.register(TypeFinder::new(
                "System.Diagnostics.Process",
                HandlerResult::DetectedShellAccess,
            ))?;
        }

        debug!(
            "event=registry_build module=registry status=ok handlers={} mode={} host_version={}",
            registry.len(),
            config.mode.as_str(),
            config.epoch.host_version
        );
        Ok(registry)
    }

    fn register_reshaping_rules(&mut self) -> Result<(), RegistryError> {
        self.register(StaticFieldToConstantRewriter::new(
            "StardewValley.Game1",
            "tileSize",
            64_i32,
        ))?;
        self.register(TypeReferenceRewriter::new(
            MENU_LIST_SIGNATURE,
            TypeRef::generic(
                "mscorlib",
                "System.Collections.Generic.List`1",
                vec![TypeRef::new(
                    "StardewValley",
                    "StardewValley.Menus.IClickableMenu",
                )],
            ),
        )?)?;
        for (type_name, field_name) in FIELDS_TO_PROPERTIES {
            self.register(FieldToPropertyRewriter::new(*type_name, *field_name))?;
        }
        for (old_type, new_type, field_name, accessor) in FIELDS_TO_SINGLETONS {
            self.register(TypeFieldToAnotherTypeFieldRewriter::new(
                *old_type,
                *new_type,
                *field_name,
                *accessor,
            ))?;
        }
        Ok(())
    }

    fn register_stability_finders(&mut self, strict_api: bool) -> Result<(), RegistryError> {
        self.register(TypeFinder::new(
            "Harmony.HarmonyInstance",
            HandlerResult::DetectedGamePatch,
        ))?;
        self.register(TypeFinder::new(
            "HarmonyLib.Harmony",
            HandlerResult::DetectedGamePatch,
        ))?;
        self.register(TypeFinder::new(
            "System.Runtime.CompilerServices.CallSite",
            HandlerResult::DetectedDynamic,
        ))?;
        for field_name in SAVE_SERIALIZER_FIELDS {
            self.register(FieldFinder::new(
                "StardewValley.SaveGame",
                *field_name,
                HandlerResult::DetectedSaveSerializer,
            ))?;
        }
        for event_name in ["UnvalidatedUpdateTicked", "UnvalidatedUpdateTicking"] {
            self.register(EventFinder::new(
                "StardewModdingAPI.Events.ISpecialisedEvents",
                event_name,
                HandlerResult::DetectedUnvalidatedUpdateHook,
            ))?;
        }
        if !strict_api {
            self.register(EventFinder::new(
                "StardewModdingAPI.Events.SpecialisedEvents",
                "UnvalidatedUpdateTick",
                HandlerResult::DetectedUnvalidatedUpdateHook,
            ))?;
        }
        Ok(())
    }
}

/// Facade table for `original`, or `None` when the facade type is not part
/// of this host's symbol table.
fn facade_table(symbols: &SymbolTable, original: &str, facade: &str) -> Option<FacadeTable> {
    let facade_name = format!("{FACADE_NAMESPACE}.{facade}");
    let (Some(facade_type), Some(scope)) = (
        symbols.find_type(&facade_name),
        symbols.type_assembly(&facade_name),
    ) else {
        debug!(
            "event=facade_skip module=registry status=skipped original={} facade={}",
            original, facade_name
        );
        return None;
    };

    let mut table = FacadeTable::from_declarations(original, facade_type, scope);
    for (alias_type, original_name, alias_target) in FACADE_ALIASES {
        if *alias_type == original {
            table = table.with_alias(original_name, facade_type, alias_target);
        }
    }
    Some(table)
}
