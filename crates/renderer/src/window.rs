use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use tracing::{debug, error, info, warn};
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoopBuilder, EventLoopProxy};
use winit::window::{Fullscreen, Window, WindowBuilder};

use crate::gpu::GpuState;
use crate::runtime::{time_source, FrameScheduler};
use crate::sketch::{dispatch, FrameInfo, InputEvent, InputTracker, Key, KeyInput, Sketch};
use crate::stage::{Frame, Stage};
use crate::types::{AdapterProfile, RendererConfig};

const SOFTWARE_FPS_CAP: f32 = 15.0;

#[derive(Debug)]
pub(crate) enum RunnerEvent {
    Message(String),
}

/// Posts strings to the running sketch's `got_message` hook from any thread.
#[derive(Clone)]
pub struct MessageSender {
    proxy: EventLoopProxy<RunnerEvent>,
}

impl MessageSender {
    pub fn send(&self, message: impl Into<String>) -> Result<()> {
        self.proxy
            .send_event(RunnerEvent::Message(message.into()))
            .map_err(|_| anyhow!("event loop has exited; message dropped"))
    }
}

impl fmt::Debug for MessageSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageSender").finish_non_exhaustive()
    }
}

/// GPU state plus the window it renders into. Field order matters: the
/// surface inside `gpu` must be dropped before `window`.
struct WindowState {
    gpu: GpuState,
    window: Arc<Window>,
}

impl WindowState {
    fn window(&self) -> &Window {
        self.window.as_ref()
    }
}

/// The FPS cap actually used: software adapters drop to a low cap unless the
/// user picked one.
fn effective_fps(config: &RendererConfig, profile: &AdapterProfile) -> Option<f32> {
    if profile.is_software() && !config.fps_from_user {
        Some(SOFTWARE_FPS_CAP)
    } else {
        config.target_fps
    }
}

fn is_escape_exit(input: &KeyInput, exit_on_escape: bool) -> bool {
    exit_on_escape && input.key == Key::Escape && !input.repeat
}

pub(crate) fn run<S: Sketch>(config: &RendererConfig, mut sketch: S) -> Result<()> {
    let event_loop = EventLoopBuilder::<RunnerEvent>::with_user_event()
        .build()
        .map_err(|err| anyhow!("failed to create event loop: {err}"))?;
    let messages = MessageSender {
        proxy: event_loop.create_proxy(),
    };

    let mut builder = WindowBuilder::new()
        .with_title(config.title.clone())
        .with_inner_size(PhysicalSize::new(config.surface_size.0, config.surface_size.1));
    if config.fullscreen {
        builder = builder.with_fullscreen(Some(Fullscreen::Borderless(None)));
    }
    let window = builder
        .build(&event_loop)
        .context("failed to create window")?;
    let window = Arc::new(window);

    let gpu = GpuState::new(
        window.as_ref(),
        window.inner_size(),
        config.antialiasing,
        config.color_space,
        config.vsync,
    )
    .context("failed to initialise GPU")?;
    let mut state = WindowState { gpu, window };

    let profile = state.gpu.adapter_profile().clone();
    let target_fps = effective_fps(config, &profile);
    if profile.is_software() && !config.fps_from_user {
        warn!(
            adapter = %profile.name,
            backend = ?profile.backend,
            cap = SOFTWARE_FPS_CAP,
            "software rasterizer detected; capping frame rate (override with --fps)"
        );
    }

    let mut stage = Stage::new(&mut state.gpu, &config.shader_dir, messages);
    sketch.setup(&mut stage).context("sketch setup failed")?;
    if stage.exit_requested() {
        info!("sketch requested exit during setup");
        return Ok(());
    }
    info!(
        width = state.gpu.size().width,
        height = state.gpu.size().height,
        shaders = state.gpu.shader_count(),
        planes = state.gpu.plane_count(),
        fps = ?target_fps,
        "setup complete; entering event loop"
    );

    let mut clock = time_source(config.fixed_time);
    clock.reset();
    let mut scheduler = FrameScheduler::new(target_fps);
    let mut input = InputTracker::default();
    let exit_on_escape = config.exit_on_escape;
    let mut failure: Option<anyhow::Error> = None;
    let failure_slot = &mut failure;

    state.window().request_redraw();

    let run_result = event_loop.run(move |event, elwt| match event {
        Event::UserEvent(RunnerEvent::Message(message)) => {
            dispatch(&mut sketch, &InputEvent::Message(message));
        }
        Event::WindowEvent { window_id, event } if window_id == state.window().id() => {
            match event {
                WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                    elwt.exit();
                }
                WindowEvent::KeyboardInput { event, .. } => {
                    let key = KeyInput {
                        key: Key::from_winit(&event.logical_key),
                        repeat: event.repeat,
                    };
                    match event.state {
                        ElementState::Pressed => {
                            dispatch(&mut sketch, &InputEvent::KeyPressed(key));
                            if is_escape_exit(&key, exit_on_escape) {
                                debug!("escape pressed; exiting");
                                elwt.exit();
                            }
                        }
                        ElementState::Released => {
                            dispatch(&mut sketch, &InputEvent::KeyReleased(key));
                        }
                    }
                }
                WindowEvent::CursorMoved { position, .. } => {
                    let event = input.cursor_moved(position.x as f32, position.y as f32);
                    dispatch(&mut sketch, &event);
                }
                WindowEvent::MouseInput {
                    state: button_state,
                    button,
                    ..
                } => {
                    let pressed = button_state == ElementState::Pressed;
                    if let Some(event) = input.button(pressed, button.into()) {
                        dispatch(&mut sketch, &event);
                    }
                }
                WindowEvent::MouseWheel { delta, .. } => {
                    let (dx, dy) = match delta {
                        MouseScrollDelta::LineDelta(x, y) => (x, y),
                        MouseScrollDelta::PixelDelta(position) => {
                            (position.x as f32, position.y as f32)
                        }
                    };
                    dispatch(&mut sketch, &input.scrolled(dx, dy));
                }
                WindowEvent::Focused(false) => {
                    input.release_all();
                }
                WindowEvent::DroppedFile(path) => {
                    dispatch(&mut sketch, &input.file_dropped(path));
                }
                WindowEvent::Resized(new_size) => {
                    if new_size.width > 0 && new_size.height > 0 {
                        state.gpu.resize(new_size);
                        dispatch(
                            &mut sketch,
                            &InputEvent::WindowResized {
                                width: new_size.width,
                                height: new_size.height,
                            },
                        );
                    }
                }
                WindowEvent::ScaleFactorChanged {
                    mut inner_size_writer,
                    ..
                } => {
                    let _ = inner_size_writer.request_inner_size(state.gpu.size());
                }
                WindowEvent::RedrawRequested => {
                    let size = state.gpu.size();
                    let info = FrameInfo {
                        time: clock.sample(),
                        width: size.width,
                        height: size.height,
                    };
                    if let Err(err) = sketch.update(&info) {
                        error!(error = %err, "sketch update failed");
                        *failure_slot = Some(err.context("sketch update failed"));
                        elwt.exit();
                        return;
                    }

                    let mut frame =
                        Frame::new(info, state.gpu.shader_count(), state.gpu.plane_count());
                    if let Err(err) = sketch.draw(&mut frame) {
                        error!(error = %err, "sketch draw failed");
                        *failure_slot = Some(err.context("sketch draw failed"));
                        elwt.exit();
                        return;
                    }
                    let (commands, exit_requested) = frame.into_parts();

                    match state.gpu.render(&commands) {
                        Ok(()) => {}
                        Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                            state.gpu.reconfigure();
                        }
                        Err(wgpu::SurfaceError::OutOfMemory) => {
                            error!("surface out of memory; exiting");
                            *failure_slot = Some(anyhow!("surface out of memory"));
                            elwt.exit();
                        }
                        Err(wgpu::SurfaceError::Timeout) => {
                            warn!("surface timeout; retrying next frame");
                        }
                        Err(other) => {
                            warn!("surface error: {other:?}; retrying next frame");
                        }
                    }
                    scheduler.mark_rendered(Instant::now());

                    if exit_requested {
                        debug!("sketch requested exit");
                        elwt.exit();
                    }
                }
                _ => {}
            }
        }
        Event::AboutToWait => {
            let now = Instant::now();
            if scheduler.ready_for_frame(now) {
                tracing::trace!("scheduler: issuing redraw now");
                state.window().request_redraw();
                elwt.set_control_flow(ControlFlow::Wait);
            } else if let Some(deadline) = scheduler.next_deadline() {
                elwt.set_control_flow(ControlFlow::WaitUntil(deadline));
            } else {
                elwt.set_control_flow(ControlFlow::Wait);
            }
        }
        _ => {}
    });

    run_result.map_err(|err| anyhow!("window event loop error: {err}"))?;
    match failure {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(name: &str, device_type: wgpu::DeviceType) -> AdapterProfile {
        AdapterProfile {
            name: name.to_string(),
            backend: wgpu::Backend::Vulkan,
            device_type,
            max_texture_dimension: 8192,
        }
    }

    #[test]
    fn software_adapter_caps_default_fps() {
        let config = RendererConfig::default();
        let software = profile("llvmpipe", wgpu::DeviceType::Cpu);
        assert_eq!(effective_fps(&config, &software), Some(SOFTWARE_FPS_CAP));

        let hardware = profile("Radeon", wgpu::DeviceType::DiscreteGpu);
        assert_eq!(effective_fps(&config, &hardware), Some(60.0));
    }

    #[test]
    fn user_fps_survives_software_adapter() {
        let config = RendererConfig {
            target_fps: None,
            fps_from_user: true,
            ..RendererConfig::default()
        };
        let software = profile("llvmpipe", wgpu::DeviceType::Cpu);
        assert_eq!(effective_fps(&config, &software), None);
    }

    #[test]
    fn escape_exit_ignores_repeats_and_opt_out() {
        let escape = KeyInput {
            key: Key::Escape,
            repeat: false,
        };
        assert!(is_escape_exit(&escape, true));
        assert!(!is_escape_exit(&escape, false));
        assert!(!is_escape_exit(
            &KeyInput {
                repeat: true,
                ..escape
            },
            true
        ));
        assert!(!is_escape_exit(
            &KeyInput {
                key: Key::Char('q'),
                repeat: false
            },
            true
        ));
    }
}
