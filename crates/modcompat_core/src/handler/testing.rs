//! Shared fixtures for handler unit tests.

use super::HandlerContext;
use crate::model::instruction::Constant;
use crate::model::member::{EventDef, FieldDef, MethodDef, PropertyDef};
use crate::model::module::ModuleDef;
use crate::model::types::TypeRef;
use crate::monitor::RecordingMonitor;
use crate::symbols::{HostAssembly, HostType, SymbolTable};

pub(crate) const GAME: &str = "StardewValley";

pub(crate) fn game_type(name: &str) -> TypeRef {
    TypeRef::new(GAME, name)
}

pub(crate) fn int32() -> TypeRef {
    TypeRef::system("System.Int32")
}

pub(crate) fn boolean() -> TypeRef {
    TypeRef::system("System.Boolean")
}

/// Small slice of the host surface used across handler tests.
pub(crate) fn host_symbols() -> SymbolTable {
    let farmer = game_type("StardewValley.Farmer");
    let location = game_type("StardewValley.GameLocation");
    let rain = game_type("StardewValley.RainManager");
    SymbolTable::new()
        .with_assembly(
            HostAssembly::new(GAME)
                .with_type(
                    HostType::new("StardewValley.Game1")
                        .with_field(FieldDef::literal("tileSize", Constant::Int32(64)))
                        .with_field(FieldDef::new_static("isRaining", boolean()))
                        .with_property(PropertyDef::new_static("player", farmer.clone()))
                        .with_property(
                            PropertyDef::new_static("stats", game_type("StardewValley.Stats"))
                                .read_only(),
                        )
                        .with_method(MethodDef::new_static(
                            "playSound",
                            TypeRef::void(),
                            vec![TypeRef::system("System.String")],
                        )),
                )
                .with_type(
                    HostType::new("StardewValley.Character")
                        .with_property(PropertyDef::instance("currentLocation", location.clone()))
                        .with_method(MethodDef::instance("getTileX", int32(), vec![])),
                )
                .with_type(
                    HostType::new("StardewValley.Farmer")
                        .with_base("StardewValley.Character")
                        .with_field(FieldDef::instance("stamina", TypeRef::system("System.Single")))
                        .with_method(MethodDef::constructor(vec![]))
                        .with_event(EventDef::new(
                            "OnItemReceived",
                            TypeRef::system("System.Action"),
                        )),
                )
                .with_type(HostType::new("StardewValley.GameLocation"))
                .with_type(
                    HostType::new("StardewValley.RainManager")
                        .with_field(FieldDef::instance("isRaining", boolean()))
                        .with_property(PropertyDef::new_static("Instance", rain).read_only()),
                )
                .with_type(
                    HostType::new("StardewValley.Menus.ItemGrabMenu")
                        .with_field(FieldDef::instance("specialObject", TypeRef::system("System.Object"))),
                ),
        )
        .expect("fixture symbols should build")
}

/// Owns everything a `HandlerContext` borrows.
pub(crate) struct Fixture {
    pub module: ModuleDef,
    pub symbols: SymbolTable,
    pub monitor: RecordingMonitor,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_symbols(host_symbols())
    }

    pub fn with_symbols(symbols: SymbolTable) -> Self {
        Self {
            module: ModuleDef::new("Fixture", "FixtureMod").with_reference(GAME),
            symbols,
            monitor: RecordingMonitor::new(),
        }
    }

    pub fn ctx(&self, platform_changed: bool) -> HandlerContext<'_> {
        HandlerContext {
            module: &self.module,
            type_name: "FixtureMod.ModEntry",
            method_name: "Entry",
            symbols: &self.symbols,
            monitor: &self.monitor,
            platform_changed,
        }
    }
}
