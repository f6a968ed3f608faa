//! `removeblock [reload | <material> [world]]`

use std::time::Instant;

use reaper_chunk::WorldSource;
use reaper_region::Companions;
use reaper_runtime::TaskScheduler;

use crate::service::{PurgeService, RemovalReport, ServiceError};

pub const COMMAND_NAME: &str = "removeblock";

/// Whoever typed the command.
pub trait CommandSender {
    fn has_permission(&self, node: &str) -> bool;

    fn send_message(&mut self, message: &str);
}

/// Everything a command may touch on the host side.
pub struct CommandContext<'a> {
    pub worlds: &'a dyn WorldSource,
    pub companions: &'a dyn Companions,
    pub scheduler: &'a mut dyn TaskScheduler,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommandOutcome {
    Denied,
    MissingArgument,
    Reloaded,
    ReloadFailed,
    UnknownMaterial,
    UnknownWorld,
    Removed {
        report: RemovalReport,
        elapsed_nanos: u128,
    },
    NotReady,
}

/// Runs `removeblock`. Always handled: every path ends in a reply to `sender`.
pub fn execute(
    service: &mut PurgeService,
    sender: &mut dyn CommandSender,
    args: &[&str],
    ctx: &mut CommandContext<'_>,
) -> CommandOutcome {
    let started = Instant::now();

    if !sender.has_permission(&service.config().command_permission) {
        sender.send_message(&service.messages().permission);
        return CommandOutcome::Denied;
    }

    let Some(&first) = args.first() else {
        sender.send_message(&service.messages().block_name);
        return CommandOutcome::MissingArgument;
    };

    if first.eq_ignore_ascii_case("reload") {
        return match service.reload(ctx.companions) {
            Ok(_) => {
                sender.send_message(&service.messages().reload_complete);
                CommandOutcome::Reloaded
            }
            Err(e) => {
                log::error!("reload failed: {}", e);
                sender.send_message(&service.messages().reload_failed);
                CommandOutcome::ReloadFailed
            }
        };
    }

    let Some(material) = service.catalog().get(first) else {
        sender.send_message(&service.messages().unknown_block_name);
        return CommandOutcome::UnknownMaterial;
    };

    let result = match args.get(1) {
        None => service.remove_everywhere(ctx.worlds, material, &mut *ctx.scheduler),
        Some(world) => service.remove_in_world(ctx.worlds, world, material, &mut *ctx.scheduler),
    };

    match result {
        Ok(report) => {
            let elapsed_nanos = started.elapsed().as_nanos();
            log::info!(
                "{} {:?}: {} cells scheduled across {} chunks",
                COMMAND_NAME,
                args,
                report.scheduled,
                report.chunks
            );
            sender.send_message(&service.messages().blocks_deleted(elapsed_nanos));
            CommandOutcome::Removed {
                report,
                elapsed_nanos,
            }
        }
        Err(ServiceError::UnknownWorld(_)) => {
            sender.send_message(&service.messages().unknown_world_name);
            CommandOutcome::UnknownWorld
        }
        Err(e) => {
            log::warn!("{} refused: {}", COMMAND_NAME, e);
            sender.send_message(&service.messages().not_ready);
            CommandOutcome::NotReady
        }
    }
}

/// Tab completion for the argument currently being typed (the last one).
pub fn complete(service: &PurgeService, worlds: &dyn WorldSource, args: &[&str]) -> Vec<String> {
    match args {
        [] => complete(service, worlds, &[""]),
        [prefix] => {
            let mut out: Vec<String> = std::iter::once("reload")
                .chain(service.catalog().names())
                .filter(|name| name.starts_with(prefix))
                .map(str::to_string)
                .collect();
            out.sort();
            out
        }
        [first, prefix] if !first.eq_ignore_ascii_case("reload") => worlds
            .worlds()
            .iter()
            .filter(|w| w.starts_with(prefix))
            .map(|w| w.to_string())
            .collect(),
        _ => Vec::new(),
    }
}
