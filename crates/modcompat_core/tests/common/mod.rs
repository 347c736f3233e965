#![allow(dead_code)]

use modcompat_core::model::instruction::{Constant, Instruction};
use modcompat_core::model::member::{EventDef, FieldDef, MethodDef, PropertyDef};
use modcompat_core::model::module::{ModuleDef, ModuleMethod, ModuleType};
use modcompat_core::model::types::TypeRef;
use modcompat_core::{
    HostAssembly, HostEpoch, HostType, HostVersion, InstructionRegistry, ModLoader, Platform,
    RecordingMonitor, Report, ScanConfig, ScanMode, SymbolTable,
};

pub const GAME: &str = "StardewValley";
pub const API: &str = "StardewModdingAPI";
pub const FRAMEWORK: &str = "MonoGame.Framework";
pub const SPRITE_BATCH: &str = "Microsoft.Xna.Framework.Graphics.SpriteBatch";

pub fn game(name: &str) -> TypeRef {
    TypeRef::new(GAME, name)
}

pub fn api(name: &str) -> TypeRef {
    TypeRef::new(API, name)
}

pub fn sprite_batch() -> TypeRef {
    TypeRef::new(FRAMEWORK, SPRITE_BATCH)
}

pub fn int32() -> TypeRef {
    TypeRef::system("System.Int32")
}

pub fn boolean() -> TypeRef {
    TypeRef::system("System.Boolean")
}

pub fn string() -> TypeRef {
    TypeRef::system("System.String")
}

pub fn menu_list() -> TypeRef {
    TypeRef::generic(
        "mscorlib",
        "System.Collections.Generic.IList`1",
        vec![game("StardewValley.Menus.IClickableMenu")],
    )
}

/// Host surface of a current game build plus the loader's facades.
pub fn host_symbols() -> SymbolTable {
    let farmer = game("StardewValley.Farmer");
    SymbolTable::new()
        .with_assembly(
            HostAssembly::new(GAME)
                .with_type(
                    HostType::new("StardewValley.Game1")
                        .with_field(FieldDef::literal("tileSize", Constant::Int32(64)))
                        .with_property(PropertyDef::new_static("player", farmer.clone()))
                        .with_property(
                            PropertyDef::new_static("stats", game("StardewValley.Stats"))
                                .read_only(),
                        )
                        .with_method(MethodDef::new_static(
                            "playSound",
                            TypeRef::void(),
                            vec![string()],
                        )),
                )
                .with_type(HostType::new("StardewValley.Stats"))
                .with_type(
                    HostType::new("StardewValley.Character")
                        .with_property(PropertyDef::instance(
                            "currentLocation",
                            game("StardewValley.GameLocation"),
                        ))
                        .with_method(MethodDef::instance("getTileX", int32(), vec![])),
                )
                .with_type(
                    HostType::new("StardewValley.Farmer")
                        .with_base("StardewValley.Character")
                        .with_field(FieldDef::instance("stamina", TypeRef::system("System.Single")))
                        .with_method(MethodDef::constructor(vec![])),
                )
                .with_type(HostType::new("StardewValley.GameLocation"))
                .with_type(HostType::new("StardewValley.Menus.IClickableMenu"))
                .with_type(
                    HostType::new("StardewValley.RainManager")
                        .with_field(FieldDef::instance("isRaining", boolean()))
                        .with_property(
                            PropertyDef::new_static(
                                "Instance",
                                game("StardewValley.RainManager"),
                            )
                            .read_only(),
                        ),
                )
                .with_type(HostType::new("StardewValley.SaveGame").with_field(
                    FieldDef::new_static(
                        "serializer",
                        TypeRef::system("System.Xml.Serialization.XmlSerializer"),
                    ),
                )),
        )
        .and_then(|table| {
            table.with_assembly(
                HostAssembly::new(API)
                    .with_type(
                        HostType::new(
                            "StardewModdingAPI.Framework.RewriteFacades.SpriteBatchMethods",
                        )
                        .with_method(MethodDef::new_static("Foo", TypeRef::void(), vec![])),
                    )
                    .with_type(
                        HostType::new("StardewModdingAPI.Events.ISpecialisedEvents").with_event(
                            EventDef::new(
                                "UnvalidatedUpdateTicked",
                                TypeRef::system("System.EventHandler"),
                            ),
                        ),
                    ),
            )
        })
        .and_then(|table| {
            table.with_assembly(
                HostAssembly::new(FRAMEWORK).with_type(
                    HostType::new(SPRITE_BATCH).with_method(MethodDef::new_static(
                        "Foo",
                        TypeRef::void(),
                        vec![],
                    )),
                ),
            )
        })
        .expect("host symbols should build")
}

/// Current host on Windows, so Linux-built modules need platform facades.
pub fn config(mode: ScanMode) -> ScanConfig {
    ScanConfig {
        mode,
        epoch: HostEpoch::new(HostVersion::new(1, 3, 36), Platform::Windows),
        ..ScanConfig::default()
    }
}

pub fn module_with(name: &str, instructions: Vec<Instruction>) -> ModuleDef {
    ModuleDef::new(name, name).with_type(
        ModuleType::new(format!("{name}.ModEntry"))
            .with_method(ModuleMethod::new("Entry", instructions)),
    )
}

/// Everything a loader borrows.
pub struct Harness {
    pub symbols: SymbolTable,
    pub config: ScanConfig,
    pub registry: InstructionRegistry,
    pub monitor: RecordingMonitor,
}

impl Harness {
    pub fn new(mode: ScanMode) -> Self {
        let symbols = host_symbols();
        let config = config(mode);
        let registry =
            InstructionRegistry::standard(&config, &symbols).expect("standard registry builds");
        Self {
            symbols,
            config,
            registry,
            monitor: RecordingMonitor::new(),
        }
    }

    pub fn loader(&self) -> ModLoader<'_> {
        ModLoader::new(&self.registry, &self.symbols, &self.config, &self.monitor)
    }

    pub fn scan(&self, module: &mut ModuleDef) -> Report {
        self.loader().scan(module)
    }
}
