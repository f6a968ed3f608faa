use std::fs;
use std::sync::Arc;

use reaper::command::{self, CommandContext, CommandOutcome, CommandSender};
use reaper::{ConfigSource, HostEvent, Lifecycle, PurgeConfig, PurgeService, ServiceError};
use reaper_blocks::{Material, MaterialCatalog};
use reaper_chunk::{BlockSink, MemoryWorld};
use reaper_geom::{ChunkKey, Coordinate, Cuboid};
use reaper_region::{CuboidRegions, NoCompanions, StaticCompanions};
use reaper_runtime::TickQueue;
use reaper_store::DataDocument;

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn spawner() -> Material {
    MaterialCatalog::builtin().get("SPAWNER").unwrap()
}

fn world_with_spawners(at: &[(i32, i32, i32)]) -> MemoryWorld {
    let mut host = MemoryWorld::new();
    host.add_world("world", 16);
    host.load_chunk("world", 0, 0).unwrap();
    host.load_chunk("world", 1, 0).unwrap();
    for &(x, y, z) in at {
        host.set_material(&Coordinate::new("world", x, y, z), spawner())
            .unwrap();
    }
    host
}

fn ready_service(cfg: PurgeConfig, companions: &StaticCompanions) -> PurgeService {
    let mut service = PurgeService::new(
        ConfigSource::Fixed(cfg),
        MaterialCatalog::builtin(),
        DataDocument::in_memory(),
    );
    service.reload(companions).unwrap();
    service
}

struct Player {
    allowed: bool,
    replies: Vec<String>,
}

impl Player {
    fn new(allowed: bool) -> Self {
        Self {
            allowed,
            replies: Vec::new(),
        }
    }
}

impl CommandSender for Player {
    fn has_permission(&self, node: &str) -> bool {
        self.allowed && node == "reaper.command"
    }

    fn send_message(&mut self, message: &str) {
        self.replies.push(message.to_string());
    }
}

#[test]
fn placed_blocks_are_never_scheduled() {
    init();
    let mut host = world_with_spawners(&[(1, 2, 3), (17, 4, 5)]);
    let companions = StaticCompanions::default();
    let mut service = ready_service(PurgeConfig::default(), &companions);
    let mut queue = TickQueue::new();

    let placed = Coordinate::new("world", 1, 2, 3);
    service
        .handle_event(
            &HostEvent::BlockPlaced {
                at: placed.clone(),
                owner: "alice".into(),
            },
            &host,
            &mut queue,
        )
        .unwrap();
    assert!(service.is_excluded(&placed));
    assert_eq!(service.store().owner_of(&placed), Some("alice"));

    let report = service
        .remove_in_world(&host, "world", spawner(), &mut queue)
        .unwrap();
    assert_eq!(report.chunks, 2);
    assert_eq!(report.scheduled, 1);

    queue.run_ticks(3, &mut host);
    assert_eq!(host.get_block(&placed), Some(spawner()));
    assert_eq!(host.count("world", spawner()), 1);
}

#[test]
fn broken_blocks_become_removable_again() {
    init();
    let host = world_with_spawners(&[(1, 2, 3)]);
    let companions = StaticCompanions::default();
    let mut service = ready_service(PurgeConfig::default(), &companions);
    let mut queue = TickQueue::new();
    let at = Coordinate::new("world", 1, 2, 3);

    for event in [
        HostEvent::BlockPlaced {
            at: at.clone(),
            owner: "bob".into(),
        },
        HostEvent::BlockBroken { at: at.clone() },
    ] {
        service.handle_event(&event, &host, &mut queue).unwrap();
    }
    assert!(!service.is_excluded(&at));
    assert_eq!(service.store().len(), 0);
}

#[test]
fn untracked_placements_leave_the_store_alone() {
    let host = world_with_spawners(&[]);
    let cfg = PurgeConfig {
        track_placed_blocks: false,
        ..PurgeConfig::default()
    };
    let companions = StaticCompanions::default();
    let mut service = ready_service(cfg, &companions);
    let mut queue = TickQueue::new();
    let at = Coordinate::new("world", 0, 0, 0);
    service
        .handle_event(
            &HostEvent::BlockPlaced {
                at: at.clone(),
                owner: "carol".into(),
            },
            &host,
            &mut queue,
        )
        .unwrap();
    assert!(!service.is_excluded(&at));
}

fn protected_spawn() -> StaticCompanions {
    let mut regions = CuboidRegions::new();
    regions.add("spawn", "world", Cuboid::from_corners([0, 0, 0], [15, 15, 15]));
    StaticCompanions {
        manager: Some(Arc::new(regions)),
        editor: true,
    }
}

#[test]
fn protected_cells_are_skipped_when_protection_is_available() {
    init();
    let mut host = world_with_spawners(&[(4, 4, 4), (20, 4, 4)]);
    let companions = protected_spawn();
    let service = ready_service(PurgeConfig::default(), &companions);
    assert!(service.oracle().is_available());
    let mut queue = TickQueue::new();

    let report = service
        .remove_everywhere(&host, spawner(), &mut queue)
        .unwrap();
    assert_eq!(report.scheduled, 1);
    queue.run_ticks(3, &mut host);
    assert_eq!(
        host.get_block(&Coordinate::new("world", 4, 4, 4)),
        Some(spawner())
    );
    assert_eq!(
        host.get_block(&Coordinate::new("world", 20, 4, 4)),
        Some(Material::AIR)
    );
}

#[test]
fn protection_needs_every_companion_and_the_flag() {
    let host = world_with_spawners(&[(4, 4, 4)]);
    let mut no_editor = protected_spawn();
    no_editor.editor = false;
    let disabled = PurgeConfig {
        region_protection: false,
        ..PurgeConfig::default()
    };

    for (cfg, companions) in [
        (PurgeConfig::default(), no_editor),
        (disabled, protected_spawn()),
        (PurgeConfig::default(), StaticCompanions::default()),
    ] {
        let service = ready_service(cfg, &companions);
        assert!(!service.oracle().is_available());
        let mut queue = TickQueue::new();
        let report = service
            .remove_in_world(&host, "world", spawner(), &mut queue)
            .unwrap();
        assert_eq!(report.scheduled, 1);
    }
}

#[test]
fn reload_replaces_the_watched_set() {
    init();
    let mut host = MemoryWorld::new();
    host.add_world("world", 8);
    let companions = StaticCompanions::default();
    let mut service = ready_service(PurgeConfig::default(), &companions);
    assert_eq!(service.watched(), &[spawner()]);

    service.set_config_source(ConfigSource::Fixed(PurgeConfig {
        watched_materials: vec!["CHEST".into(), "NOT_A_BLOCK".into()],
        ..PurgeConfig::default()
    }));
    let summary = service.reload(&companions).unwrap();
    assert_eq!(summary.watched, 1);
    assert_eq!(summary.skipped_materials, 1);

    host.load_chunk("world", 0, 0).unwrap();
    host.set_material(&Coordinate::new("world", 3, 3, 3), spawner())
        .unwrap();
    let mut queue = TickQueue::new();
    let report = service
        .handle_event(
            &HostEvent::ChunkLoaded {
                chunk: ChunkKey::new("world", 0, 0),
            },
            &host,
            &mut queue,
        )
        .unwrap();
    assert_eq!(report.scheduled, 0);

    // Explicit commands are not limited to the watched set; names match exactly.
    let mut player = Player::new(true);
    let mut ctx = CommandContext {
        worlds: &host,
        companions: &companions,
        scheduler: &mut queue,
    };
    let outcome = command::execute(&mut service, &mut player, &["spawner"], &mut ctx);
    assert_eq!(outcome, CommandOutcome::UnknownMaterial);
    let outcome = command::execute(&mut service, &mut player, &["SPAWNER"], &mut ctx);
    assert!(matches!(
        outcome,
        CommandOutcome::Removed { report, .. } if report.scheduled == 1
    ));
}

#[test]
fn chunk_load_schedules_every_watched_material() {
    let mut host = world_with_spawners(&[(1, 1, 1), (2, 2, 2)]);
    let tnt = MaterialCatalog::builtin().get("TNT").unwrap();
    host.set_material(&Coordinate::new("world", 3, 3, 3), tnt)
        .unwrap();
    let companions = StaticCompanions::default();
    let mut service = ready_service(
        PurgeConfig {
            watched_materials: vec!["SPAWNER".into(), "TNT".into()],
            ..PurgeConfig::default()
        },
        &companions,
    );
    let mut queue = TickQueue::new();
    let report = service
        .handle_event(
            &HostEvent::ChunkLoaded {
                chunk: ChunkKey::new("world", 0, 0),
            },
            &host,
            &mut queue,
        )
        .unwrap();
    assert_eq!(report.chunks, 2);
    assert_eq!(report.scheduled, 3);

    // A cell cleared by someone else in the meantime still applies cleanly.
    host.set_material(&Coordinate::new("world", 1, 1, 1), Material::AIR)
        .unwrap();
    assert_eq!(queue.run_ticks(2, &mut host).applied, 0);
    let stats = queue.run_ticks(1, &mut host);
    assert_eq!(stats.applied, 3);
    assert_eq!(host.count("world", tnt), 0);
    assert_eq!(host.count("world", spawner()), 0);
}

#[test]
fn removals_in_unloaded_chunks_are_dropped_alone() {
    let mut host = world_with_spawners(&[(1, 1, 1), (17, 1, 1)]);
    let companions = StaticCompanions::default();
    let service = ready_service(PurgeConfig::default(), &companions);
    let mut queue = TickQueue::new();
    service
        .remove_in_world(&host, "world", spawner(), &mut queue)
        .unwrap();
    assert!(host.unload_chunk(&ChunkKey::new("world", 1, 0)));

    let stats = queue.run_ticks(3, &mut host);
    assert_eq!((stats.applied, stats.dropped), (1, 1));
    assert_eq!(
        host.get_block(&Coordinate::new("world", 1, 1, 1)),
        Some(Material::AIR)
    );
}

#[test]
fn nothing_runs_before_the_first_reload() {
    let host = world_with_spawners(&[(1, 1, 1)]);
    let mut service = PurgeService::new(
        ConfigSource::Fixed(PurgeConfig::default()),
        MaterialCatalog::builtin(),
        DataDocument::in_memory(),
    );
    assert_eq!(service.lifecycle(), Lifecycle::Unloaded);
    let mut queue = TickQueue::new();
    let err = service
        .remove_in_world(&host, "world", spawner(), &mut queue)
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotReady(Lifecycle::Unloaded)));
    assert_eq!(queue.pending(), 0);

    let companions = NoCompanions;
    let mut player = Player::new(true);
    let mut ctx = CommandContext {
        worlds: &host,
        companions: &companions,
        scheduler: &mut queue,
    };
    let outcome = command::execute(&mut service, &mut player, &["SPAWNER"], &mut ctx);
    assert_eq!(outcome, CommandOutcome::NotReady);
    assert_eq!(player.replies, vec![service.messages().not_ready.clone()]);

    // `reload` is how a host brings the service up.
    let outcome = command::execute(&mut service, &mut player, &["ReLoAd"], &mut ctx);
    assert_eq!(outcome, CommandOutcome::Reloaded);
    assert_eq!(service.lifecycle(), Lifecycle::Ready);
}

#[test]
fn command_replies() {
    let host = world_with_spawners(&[(1, 1, 1)]);
    let companions = StaticCompanions::default();
    let mut service = ready_service(PurgeConfig::default(), &companions);
    let mut queue = TickQueue::new();
    let mut ctx = CommandContext {
        worlds: &host,
        companions: &companions,
        scheduler: &mut queue,
    };

    let mut stranger = Player::new(false);
    let outcome = command::execute(&mut service, &mut stranger, &["SPAWNER"], &mut ctx);
    assert_eq!(outcome, CommandOutcome::Denied);
    assert_eq!(stranger.replies, vec![service.messages().permission.clone()]);

    let mut op = Player::new(true);
    let cases = vec![
        (vec![], CommandOutcome::MissingArgument),
        (vec!["DIRTT"], CommandOutcome::UnknownMaterial),
        (vec!["SPAWNER", "mars"], CommandOutcome::UnknownWorld),
    ];
    for (args, expected) in cases {
        assert_eq!(
            command::execute(&mut service, &mut op, &args, &mut ctx),
            expected
        );
    }
    assert_eq!(
        op.replies,
        vec![
            service.messages().block_name.clone(),
            service.messages().unknown_block_name.clone(),
            service.messages().unknown_world_name.clone(),
        ]
    );

    let outcome = command::execute(&mut service, &mut op, &["SPAWNER", "world"], &mut ctx);
    let CommandOutcome::Removed { report, .. } = outcome else {
        panic!("expected a removal, got {:?}", outcome);
    };
    assert_eq!(report.scheduled, 1);
    let last = op.replies.last().unwrap();
    assert!(last.starts_with("\u{00A7}aBlocks scheduled for removal in \u{00A7}e"));
    assert!(!last.contains("%s"));
}

#[test]
fn completion_offers_materials_then_worlds() {
    let host = world_with_spawners(&[]);
    let companions = StaticCompanions::default();
    let service = ready_service(PurgeConfig::default(), &companions);

    assert_eq!(
        command::complete(&service, &host, &["SP"]),
        vec!["SPAWNER".to_string()]
    );
    let first = command::complete(&service, &host, &[]);
    assert!(first.contains(&"reload".to_string()));
    assert!(first.contains(&"BEDROCK".to_string()));
    assert_eq!(
        command::complete(&service, &host, &["SPAWNER", "w"]),
        vec!["world".to_string()]
    );
    assert!(command::complete(&service, &host, &["reload", ""]).is_empty());
}

#[test]
fn exclusions_survive_a_restart() {
    init();
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("plugin").join("data.toml");
    let at = Coordinate::new("world the end", -5, 70, 12);
    let companions = NoCompanions;

    {
        let mut service = PurgeService::new(
            ConfigSource::Fixed(PurgeConfig::default()),
            MaterialCatalog::builtin(),
            DataDocument::open(data.clone()),
        );
        service.reload(&companions).unwrap();
        let host = MemoryWorld::new();
        let mut queue = TickQueue::new();
        service
            .handle_event(
                &HostEvent::BlockPlaced {
                    at: at.clone(),
                    owner: "dave".into(),
                },
                &host,
                &mut queue,
            )
            .unwrap();
    }
    assert!(data.exists());

    let mut service = PurgeService::new(
        ConfigSource::Fixed(PurgeConfig::default()),
        MaterialCatalog::builtin(),
        DataDocument::open(data),
    );
    assert!(!service.is_excluded(&at));
    let summary = service.reload(&companions).unwrap();
    assert_eq!(summary.excluded, 1);
    assert!(service.is_excluded(&at));
    assert_eq!(service.store().owner_of(&at), Some("dave"));
}

#[test]
fn a_corrupt_data_file_fails_the_reload() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("data.toml");
    fs::write(&data, "blocks = [[[").unwrap();
    let mut service = PurgeService::new(
        ConfigSource::Fixed(PurgeConfig::default()),
        MaterialCatalog::builtin(),
        DataDocument::open(data),
    );
    let err = service.reload(&NoCompanions).unwrap_err();
    assert!(matches!(err, ServiceError::Store(_)));
    assert_eq!(service.lifecycle(), Lifecycle::Unloaded);
}

#[test]
fn a_broken_config_file_keeps_the_previous_settings() {
    init();
    let dir = tempfile::tempdir().unwrap();
    let cfg_path = dir.path().join("reaper.toml");
    fs::write(
        &cfg_path,
        "remove-blocks-on-chunk-load = [\"TNT\"]\nremoval-delay-ticks = 5\n",
    )
    .unwrap();
    let mut service = PurgeService::new(
        ConfigSource::File(cfg_path.clone()),
        MaterialCatalog::builtin(),
        DataDocument::in_memory(),
    );
    service.reload(&NoCompanions).unwrap();
    assert_eq!(service.config().removal_delay_ticks, 5);

    fs::write(&cfg_path, "removal-delay-ticks = \"soon\"").unwrap();
    service.reload(&NoCompanions).unwrap();
    assert_eq!(service.config().removal_delay_ticks, 5);
    assert_eq!(
        service.watched(),
        &[MaterialCatalog::builtin().get("TNT").unwrap()]
    );
}

#[test]
fn reload_drops_stale_exclusions_and_protection() {
    init();
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("data.toml");
    let mut host = world_with_spawners(&[(9, 1, 9)]);
    let companions = protected_spawn();
    let mut service = PurgeService::new(
        ConfigSource::Fixed(PurgeConfig::default()),
        MaterialCatalog::builtin(),
        DataDocument::open(data.clone()),
    );
    service.reload(&companions).unwrap();
    assert!(service.oracle().is_available());

    let placed = Coordinate::new("world", 9, 1, 9);
    let mut queue = TickQueue::new();
    service
        .handle_event(
            &HostEvent::BlockPlaced {
                at: placed.clone(),
                owner: "erin".into(),
            },
            &host,
            &mut queue,
        )
        .unwrap();
    host.set_material(&placed, spawner()).unwrap();
    assert!(service.is_excluded(&placed));

    // Same service, edited data file, protection switched off.
    fs::write(&data, "[blocks]\n").unwrap();
    service.set_config_source(ConfigSource::Fixed(PurgeConfig {
        region_protection: false,
        ..PurgeConfig::default()
    }));
    let summary = service.reload(&companions).unwrap();
    assert_eq!(summary.excluded, 0);
    assert!(!summary.protection);
    assert!(!service.oracle().is_available());
    assert!(!service.oracle().is_protected(&placed));
    assert!(!service.is_excluded(&placed));
    assert_eq!(service.store().owner_of(&placed), None);

    let report = service
        .remove_in_world(&host, "world", spawner(), &mut queue)
        .unwrap();
    assert_eq!(report.scheduled, 1);
    queue.run_ticks(3, &mut host);
    assert_eq!(host.get_block(&placed), Some(Material::AIR));
}
