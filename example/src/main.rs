//! Prints the merged keyboard and mouse state whenever it changes. Press
//! Escape on any keyboard to quit.
//!
//! Run with `RUST_LOG=rawpoll=debug` to watch devices being discovered.

use ::rawpoll::{
    input::{keyboard::Key, mouse::MouseButton},
    Builder,
};
use ::std::{thread, time::Duration};
use ::tracing::info;
use ::tracing_subscriber::{fmt, prelude::*, EnvFilter};

const POLL_INTERVAL: Duration = Duration::from_millis(16);

pub fn main() {
    ::tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let input = Builder::new()
        .build()
        .expect("Failed to start input thread");

    for device in input.keyboards().iter().chain(input.mice().iter()) {
        info!(
            index = device.index,
            handle = %device.handle,
            device_type = %device.device_type,
            description = %device.description,
            "Tracking device"
        );
    }

    let mut last = (input.keyboard_state(), input.mouse_state());
    while input.is_running() {
        let keyboard = input.keyboard_state();
        let mouse = input.mouse_state();
        if keyboard.is_key_pressed(Key::Escape) {
            break;
        }

        if keyboard != last.0 || mouse.wheel() != last.1.wheel() || buttons(&mouse) != buttons(&last.1)
        {
            println!(
                "keys: {:?} | buttons: {:?} | wheel: {:+.2} | cursor: ({}, {})",
                keyboard.pressed_keys().collect::<Vec<_>>(),
                buttons(&mouse),
                mouse.wheel(),
                mouse.position().x,
                mouse.position().y,
            );
        }

        last = (keyboard, mouse);
        thread::sleep(POLL_INTERVAL);
    }

    input.destroy().expect("Failed to stop input thread");
}

fn buttons(mouse: &::rawpoll::input::mouse::MouseState) -> Vec<MouseButton> {
    [
        MouseButton::Left,
        MouseButton::Right,
        MouseButton::Middle,
        MouseButton::Mouse4,
        MouseButton::Mouse5,
    ]
    .into_iter()
    .filter(|button| mouse.is_button_pressed(*button))
    .collect()
}
