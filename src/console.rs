//! Line-oriented console over an in-memory host, used by the binary.

use std::sync::Arc;

use reaper_blocks::{Material, MaterialCatalog};
use reaper_chunk::{BlockSink, HostError, MemoryWorld, WorldSource};
use reaper_geom::{ChunkKey, Coordinate};
use reaper_region::StaticCompanions;
use reaper_runtime::TickQueue;

use crate::command::{self, CommandContext, CommandSender};
use crate::events::HostEvent;
use crate::service::PurgeService;

/// Console operator: holds every permission and collects replies.
#[derive(Default)]
pub struct ConsoleSender {
    pub replies: Vec<String>,
}

impl CommandSender for ConsoleSender {
    fn has_permission(&self, _node: &str) -> bool {
        true
    }

    fn send_message(&mut self, message: &str) {
        self.replies.push(message.to_string());
    }
}

pub const HELP: &str = "\
removeblock [reload | <material> [world]]
complete <args...>
place <world> <x> <y> <z> <material> <owner>
break <world> <x> <y> <z>
load <world> <cx> <cz>
unload <world> <cx> <cz>
tick [n]
count <world> <material>
quit";

/// Fills a freshly loaded column with bedrock, stone, and one spawner.
pub fn seed_chunk(
    host: &mut MemoryWorld,
    key: &ChunkKey,
    catalog: &MaterialCatalog,
) -> Result<(), HostError> {
    let pick = |name: &str| catalog.get(name).unwrap_or(Material::AIR);
    let (bedrock, stone, spawner) = (pick("BEDROCK"), pick("STONE"), pick("SPAWNER"));
    let height = host
        .chunk_buf(key)
        .map(|buf| buf.sy)
        .ok_or_else(|| HostError::ChunkUnloaded(key.clone()))?;
    for y in 0..height / 2 {
        host.fill_layer(key, y, if y == 0 { bedrock } else { stone })?;
    }
    if height > 2 {
        let at = Coordinate::new(
            Arc::clone(&key.world),
            key.min_x() + key.cx.rem_euclid(16),
            (height / 4).max(1) as i32,
            key.min_z() + key.cz.rem_euclid(16),
        );
        host.set_material(&at, spawner)?;
    }
    Ok(())
}

pub struct Console {
    pub service: PurgeService,
    pub host: MemoryWorld,
    pub companions: StaticCompanions,
    pub queue: TickQueue,
}

fn parse_i32(s: &str) -> Result<i32, String> {
    s.parse().map_err(|_| format!("not a number: {}", s))
}

fn parse_at(args: &[&str]) -> Result<Coordinate, String> {
    match args {
        [world, x, y, z, ..] => Ok(Coordinate::new(
            *world,
            parse_i32(x)?,
            parse_i32(y)?,
            parse_i32(z)?,
        )),
        _ => Err("expected <world> <x> <y> <z>".to_string()),
    }
}

impl Console {
    pub fn new(service: PurgeService, host: MemoryWorld, companions: StaticCompanions) -> Self {
        Self {
            service,
            host,
            companions,
            queue: TickQueue::new(),
        }
    }

    fn material(&self, name: &str) -> Result<Material, String> {
        self.service
            .catalog()
            .get(name)
            .ok_or_else(|| format!("unknown material {}", name))
    }

    fn dispatch(&mut self, event: HostEvent) -> Result<String, String> {
        let report = self
            .service
            .handle_event(&event, &self.host, &mut self.queue)
            .map_err(|e| e.to_string())?;
        Ok(format!(
            "{} chunk(s) scanned, {} removal(s) scheduled",
            report.chunks, report.scheduled
        ))
    }

    /// Executes one console line and returns the lines to print.
    pub fn run_line(&mut self, line: &str) -> Result<Vec<String>, String> {
        let words: Vec<&str> = line.split_whitespace().collect();
        let Some((&cmd, args)) = words.split_first() else {
            return Ok(Vec::new());
        };
        match cmd {
            command::COMMAND_NAME => {
                let mut sender = ConsoleSender::default();
                let mut ctx = CommandContext {
                    worlds: &self.host,
                    companions: &self.companions,
                    scheduler: &mut self.queue,
                };
                command::execute(&mut self.service, &mut sender, args, &mut ctx);
                Ok(sender.replies)
            }
            "complete" => Ok(vec![command::complete(&self.service, &self.host, args).join(" ")]),
            "place" => {
                let at = parse_at(args)?;
                let (material, owner) = match args.get(4..6) {
                    Some([m, o]) => (self.material(m)?, o.to_string()),
                    _ => return Err("expected <material> <owner>".to_string()),
                };
                self.host.set_material(&at, material).map_err(|e| e.to_string())?;
                Ok(vec![self.dispatch(HostEvent::BlockPlaced { at, owner })?])
            }
            "break" => {
                let at = parse_at(args)?;
                if self.host.get_block(&at).is_none_or(Material::is_air) {
                    return Err(format!("nothing to break at {}", at));
                }
                self.host
                    .set_material(&at, Material::AIR)
                    .map_err(|e| e.to_string())?;
                Ok(vec![self.dispatch(HostEvent::BlockBroken { at })?])
            }
            "load" | "unload" => {
                let [world, cx, cz] = args else {
                    return Err(format!("expected {} <world> <cx> <cz>", cmd));
                };
                let key = ChunkKey::new(*world, parse_i32(cx)?, parse_i32(cz)?);
                if cmd == "unload" {
                    let dropped = self.queue.discard_chunk(&key);
                    let was_loaded = self.host.unload_chunk(&key);
                    return Ok(vec![format!(
                        "unloaded={} pending removals discarded={}",
                        was_loaded, dropped
                    )]);
                }
                if !self.host.load_chunk(world, key.cx, key.cz).map_err(|e| e.to_string())? {
                    return Ok(vec![format!("{} already loaded", key)]);
                }
                seed_chunk(&mut self.host, &key, self.service.catalog()).map_err(|e| e.to_string())?;
                Ok(vec![self.dispatch(HostEvent::ChunkLoaded { chunk: key })?])
            }
            "tick" => {
                let n = match args.first() {
                    Some(s) => s.parse::<u64>().map_err(|_| format!("not a number: {}", s))?,
                    None => 1,
                };
                let stats = self.queue.run_ticks(n, &mut self.host);
                Ok(vec![format!(
                    "tick {}: {} applied, {} dropped, {} pending",
                    self.queue.now(),
                    stats.applied,
                    stats.dropped,
                    self.queue.pending()
                )])
            }
            "count" => {
                let [world, name] = args else {
                    return Err("expected count <world> <material>".to_string());
                };
                if !self.host.has_world(world) {
                    return Err(format!("unknown world {}", world));
                }
                let m = self.material(name)?;
                Ok(vec![format!("{}", self.host.count(world, m))])
            }
            "help" => Ok(HELP.lines().map(str::to_string).collect()),
            other => Err(format!("unknown command {}; try help", other)),
        }
    }
}
