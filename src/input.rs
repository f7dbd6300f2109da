use bevy::prelude::*;
use std::collections::HashSet;

pub const LEFT: &str = "left";
pub const RIGHT: &str = "right";
pub const JUMP: &str = "jump";
pub const THROW: &str = "throw";
pub const EDIT: &str = "edit";
pub const SAVE: &str = "save";
pub const LOAD: &str = "load";

/// Abstraction layer between raw input and game systems.
/// The keyboard writes here, and so can an embedder or a test.
#[derive(Resource, Default, Clone)]
pub struct VirtualInput {
    pub active: HashSet<String>,
    pub just_pressed: HashSet<String>,
    pub just_released: HashSet<String>,
}

impl VirtualInput {
    pub fn pressed(&self, action: &str) -> bool {
        self.active.contains(action)
    }

    pub fn just_pressed(&self, action: &str) -> bool {
        self.just_pressed.contains(action)
    }

    /// Hold `action` down, registering the press edge when it is new.
    pub fn press(&mut self, action: &str) {
        if self.active.insert(action.to_string()) {
            self.just_pressed.insert(action.to_string());
        }
    }

    pub fn release(&mut self, action: &str) {
        if self.active.remove(action) {
            self.just_released.insert(action.to_string());
        }
    }

    pub fn clear_frame(&mut self) {
        self.just_pressed.clear();
        self.just_released.clear();
    }
}

pub struct InputPlugin;

impl Plugin for InputPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(VirtualInput::default())
            .add_systems(
                PreUpdate,
                keyboard_to_virtual.run_if(resource_exists::<ButtonInput<KeyCode>>),
            )
            .add_systems(Last, clear_virtual_input);
    }
}

const BINDINGS: &[(&str, &[KeyCode])] = &[
    (LEFT, &[KeyCode::KeyA, KeyCode::ArrowLeft]),
    (RIGHT, &[KeyCode::KeyD, KeyCode::ArrowRight]),
    (JUMP, &[KeyCode::Space, KeyCode::KeyW, KeyCode::ArrowUp]),
    (THROW, &[KeyCode::KeyS, KeyCode::ArrowDown]),
    (EDIT, &[KeyCode::KeyE]),
    (SAVE, &[KeyCode::F5]),
    (LOAD, &[KeyCode::F9]),
];

/// Translate keyboard state to action names
fn keyboard_to_virtual(keyboard: Res<ButtonInput<KeyCode>>, mut vinput: ResMut<VirtualInput>) {
    vinput.active.clear();
    vinput.just_pressed.clear();
    vinput.just_released.clear();

    for (action, keys) in BINDINGS {
        if keys.iter().any(|k| keyboard.pressed(*k)) {
            vinput.active.insert((*action).into());
        }
        if keys.iter().any(|k| keyboard.just_pressed(*k)) {
            vinput.just_pressed.insert((*action).into());
        }
        if keys.iter().any(|k| keyboard.just_released(*k)) {
            vinput.just_released.insert((*action).into());
        }
    }
}

fn clear_virtual_input(mut vinput: ResMut<VirtualInput>) {
    vinput.clear_frame();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyboard_maps_to_actions() {
        let mut app = App::new();
        let mut keys = ButtonInput::<KeyCode>::default();
        keys.press(KeyCode::ArrowLeft);
        keys.press(KeyCode::KeyS);
        app.insert_resource(keys)
            .insert_resource(VirtualInput::default())
            .add_systems(Update, keyboard_to_virtual);

        app.update();

        let vinput = app.world().resource::<VirtualInput>();
        assert!(vinput.pressed(LEFT));
        assert!(vinput.just_pressed(THROW));
        assert!(!vinput.pressed(RIGHT));
        assert!(!vinput.pressed(EDIT));
    }

    #[test]
    fn press_registers_edge_once() {
        let mut vinput = VirtualInput::default();
        vinput.press(JUMP);
        assert!(vinput.just_pressed(JUMP));
        vinput.clear_frame();
        vinput.press(JUMP);
        assert!(!vinput.just_pressed(JUMP));
        assert!(vinput.pressed(JUMP));
        vinput.release(JUMP);
        assert!(!vinput.pressed(JUMP));
        assert!(vinput.just_released.contains(JUMP));
    }
}
