use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use engine::headless::{NullAudioOutput, NullGraphics, NullWindow};
use engine::{
    build_timeline, FrameContext, FramePacer, FrameSink, Graphics, Player, Playlist,
    ProgramCompiler, ProgramHandle, RuntimeFlags, Session, SystemTimeSource, Timeline,
    WINDOW_H, WINDOW_W,
};
use manifest::DemoManifest;
use tracing_subscriber::EnvFilter;

use crate::cli::RunArgs;

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Plays the manifest as a paced dry run against the null providers.
///
/// This driver links no display or audio backend; it exists to rehearse a
/// demo's timing and exercise the full engine path. Embedders supply real
/// providers in place of the null ones.
pub fn run(args: RunArgs) -> Result<()> {
    let Some(path) = args.manifest.as_ref() else {
        bail!("no manifest supplied; pass a demo manifest path or see `demoreel check --help`");
    };
    let manifest = DemoManifest::load(path)
        .with_context(|| format!("failed to load manifest {}", path.display()))?;
    let base = manifest_base(path);
    tracing::info!(
        title = %manifest.title,
        effects = manifest.effects.len(),
        total_secs = manifest.total_duration().as_secs_f64(),
        "starting demo playback"
    );

    let mut session = Session::new();
    session.set_flag(
        RuntimeFlags::FULLSCREEN,
        manifest.fullscreen || args.fullscreen,
    );
    session.set_flag(RuntimeFlags::USE_VSYNC, manifest.vsync || args.vsync);
    session.set_flag(RuntimeFlags::DISABLE_CURSOR, manifest.disable_cursor);
    if let Some(raw) = args.size.as_deref() {
        let (width, height) = parse_surface_size(raw)?;
        session.set(WINDOW_W, width);
        session.set(WINDOW_H, height);
    }
    if let Some(music) = manifest.music.as_ref() {
        if !(manifest.no_audio || args.no_audio) {
            tracing::info!(music = %music.display(), "headless driver: music track ignored");
        }
    }
    session.set_flag(RuntimeFlags::NO_AUDIO, true);

    let mut gfx = NullGraphics::new();
    let mut compiler =
        ProgramCompiler::new(&mut gfx).context("fixed vertex stage failed to compile")?;
    let timeline = match build_show(&mut gfx, &mut compiler, &base, &manifest) {
        Ok(timeline) => timeline,
        Err(err) => {
            // The player releases the compiler on its exit paths; match that
            // when setup fails before a player exists.
            compiler.release(&mut gfx);
            return Err(err);
        }
    };

    let player = Player::new(
        gfx,
        NullWindow::new(),
        NullAudioOutput::new(),
        SystemTimeSource,
        session,
        compiler,
        Playlist::Effects(timeline),
        None,
    )?
    .with_pacer(FramePacer::from_fps(args.fps.unwrap_or(60.0)))
    .with_frame_sink(Box::new(TransitionLogger::default()));

    player.run();
    tracing::info!(title = %manifest.title, "demo finished");
    Ok(())
}

/// Compiles every effect in the manifest and reports per-effect results.
pub fn check(path: &Path) -> Result<()> {
    let mut gfx = NullGraphics::new();
    check_with(&mut gfx, path)
}

fn check_with(gfx: &mut NullGraphics, path: &Path) -> Result<()> {
    let manifest = DemoManifest::load(path)
        .with_context(|| format!("failed to load manifest {}", path.display()))?;
    let base = manifest_base(path);

    let mut compiler =
        ProgramCompiler::new(gfx).context("fixed vertex stage failed to compile")?;
    let outcome = check_effects(gfx, &mut compiler, &base, &manifest);
    // The vertex stage goes away on every exit path, a missing shader file
    // included.
    compiler.release(gfx);
    let failures = outcome?;

    if failures > 0 {
        bail!("{failures} effect(s) failed to compile");
    }
    println!("{}: {} effects ok", manifest.title, manifest.effects.len());
    Ok(())
}

fn check_effects(
    gfx: &mut NullGraphics,
    compiler: &mut ProgramCompiler,
    base: &Path,
    manifest: &DemoManifest,
) -> Result<usize> {
    if let Some(preamble) = manifest.preamble.as_ref() {
        compiler.set_preamble(read_source(base, preamble)?);
    }
    let mut failures = 0usize;
    for (index, entry) in manifest.effects.iter().enumerate() {
        let source = read_source(base, &entry.shader)?;
        match compiler.compile(gfx, &source) {
            Ok(program) => {
                println!(
                    "  effect {index:<3} {:<32} ok ({:.1}s)",
                    entry.shader.display(),
                    entry.duration.as_secs_f64()
                );
                gfx.delete_program(program);
            }
            Err(err) => {
                failures += 1;
                println!(
                    "  effect {index:<3} {:<32} failed: {err}",
                    entry.shader.display()
                );
            }
        }
    }
    Ok(failures)
}

#[derive(Default)]
struct TransitionLogger {
    last_index: Option<usize>,
}

impl FrameSink for TransitionLogger {
    fn frame(&mut self, ctx: &FrameContext) {
        if self.last_index != Some(ctx.segment_index) {
            tracing::info!(
                index = ctx.segment_index,
                at_secs = ctx.elapsed.as_secs_f64(),
                "segment active"
            );
            self.last_index = Some(ctx.segment_index);
        }
    }
}

fn build_show(
    gfx: &mut NullGraphics,
    compiler: &mut ProgramCompiler,
    base: &Path,
    manifest: &DemoManifest,
) -> Result<Timeline<ProgramHandle>> {
    if let Some(preamble) = manifest.preamble.as_ref() {
        compiler.set_preamble(read_source(base, preamble)?);
    }
    let entries = load_effect_entries(base, manifest)?;
    build_timeline(compiler, gfx, &entries).context("failed to build the effect timeline")
}

fn manifest_base(path: &Path) -> PathBuf {
    path.parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn load_effect_entries(
    base: &Path,
    manifest: &DemoManifest,
) -> Result<Vec<(String, Duration)>> {
    manifest
        .effects
        .iter()
        .map(|entry| Ok((read_source(base, &entry.shader)?, entry.duration)))
        .collect()
}

fn read_source(base: &Path, path: &Path) -> Result<String> {
    let resolved = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };
    std::fs::read_to_string(&resolved)
        .with_context(|| format!("failed to read shader source {}", resolved.display()))
}

fn parse_surface_size(raw: &str) -> Result<(i32, i32)> {
    let (w, h) = raw
        .split_once(['x', 'X'])
        .context("size must look like 1280x720")?;
    let width: i32 = w.trim().parse().context("invalid width in size")?;
    let height: i32 = h.trim().parse().context("invalid height in size")?;
    if width <= 0 || height <= 0 {
        bail!("size dimensions must be positive");
    }
    Ok((width, height))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::cli::RunArgs;

    #[test]
    fn parses_surface_sizes() {
        assert_eq!(parse_surface_size("1280x720").unwrap(), (1280, 720));
        assert_eq!(parse_surface_size("1920X1080").unwrap(), (1920, 1080));
        assert!(parse_surface_size("1280").is_err());
        assert!(parse_surface_size("0x10").is_err());
    }

    fn write_demo(dir: &Path) -> PathBuf {
        fs::write(
            dir.join("intro.frag"),
            "void main() { gl_FragColor = vec4(1.0); }",
        )
        .unwrap();
        fs::write(
            dir.join("outro.frag"),
            "void main() { gl_FragColor = vec4(0.0); }",
        )
        .unwrap();
        let manifest_path = dir.join("demo.toml");
        fs::write(
            &manifest_path,
            r#"
title = "smoke"

[[effects]]
shader = "intro.frag"
duration = 0.02

[[effects]]
shader = "outro.frag"
duration = 0.02
"#,
        )
        .unwrap();
        manifest_path
    }

    #[test]
    fn check_accepts_a_well_formed_demo() {
        let dir = tempfile::tempdir().unwrap();
        let manifest_path = write_demo(dir.path());
        check(&manifest_path).unwrap();
    }

    #[test]
    fn check_releases_the_vertex_stage_when_a_shader_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let manifest_path = write_demo(dir.path());
        fs::remove_file(dir.path().join("outro.frag")).unwrap();
        let mut gfx = NullGraphics::new();
        let probe = gfx.clone();
        assert!(check_with(&mut gfx, &manifest_path).is_err());
        assert_eq!(probe.live_stages(), 0);
    }

    #[test]
    fn check_reports_a_blank_shader() {
        let dir = tempfile::tempdir().unwrap();
        let manifest_path = write_demo(dir.path());
        fs::write(dir.path().join("outro.frag"), "").unwrap();
        assert!(check(&manifest_path).is_err());
    }

    #[test]
    fn headless_playback_runs_to_completion() {
        let dir = tempfile::tempdir().unwrap();
        let manifest_path = write_demo(dir.path());
        let args = RunArgs {
            manifest: Some(manifest_path),
            no_audio: true,
            fps: Some(0.0),
            size: Some("640x480".into()),
            fullscreen: false,
            vsync: false,
        };
        run(args).unwrap();
    }
}
