//! JNI exports of the playback façade for `com.example.playback.PlaybackEngine`.

use std::ffi::c_void;

use jni::objects::{GlobalRef, JClass, JObject};
use jni::sys::{jboolean, jdouble, jint, JNI_FALSE, JNI_TRUE, JNI_VERSION_1_6};
use jni::{JNIEnv, JavaVM};
use once_cell::sync::OnceCell;

use crate::api;
use crate::error::{log_audio_error, AudioError};
use crate::telemetry::{self, LifecyclePhase};

/// Application context handed to ndk-context; kept alive for the process.
static ANDROID_CONTEXT: OnceCell<GlobalRef> = OnceCell::new();

/// JNI_OnLoad is called when the native library is loaded by Android
#[no_mangle]
pub extern "system" fn JNI_OnLoad(_vm: JavaVM, _reserved: *mut c_void) -> jint {
    crate::init_logging();
    telemetry::hub().record_lifecycle(LifecyclePhase::LibraryLoaded);
    log::info!("[JNI] Library loaded");
    JNI_VERSION_1_6
}

#[no_mangle]
pub extern "system" fn JNI_OnUnload(_vm: JavaVM, _reserved: *mut c_void) {
    api::delete();
    telemetry::hub().record_lifecycle(LifecyclePhase::LibraryUnloaded);
    log::info!("[JNI] Library unloaded");
}

/// Register the application context so Oboe can reach the Android audio
/// services. Must run before `create`; later calls are no-ops.
#[no_mangle]
pub extern "system" fn Java_com_example_playback_PlaybackEngine_initContext(
    mut env: JNIEnv,
    _class: JClass,
    context: JObject,
) -> jboolean {
    match init_android_context(&mut env, &context) {
        Ok(()) => JNI_TRUE,
        Err(err) => {
            log_audio_error(&err, "init_context");
            JNI_FALSE
        }
    }
}

#[no_mangle]
pub extern "system" fn Java_com_example_playback_PlaybackEngine_create(
    _env: JNIEnv,
    _class: JClass,
) -> jboolean {
    if api::create() {
        JNI_TRUE
    } else {
        JNI_FALSE
    }
}

#[no_mangle]
pub extern "system" fn Java_com_example_playback_PlaybackEngine_delete(
    _env: JNIEnv,
    _class: JClass,
) {
    api::delete();
}

#[no_mangle]
pub extern "system" fn Java_com_example_playback_PlaybackEngine_setToneOn(
    _env: JNIEnv,
    _class: JClass,
    is_tone_on: jboolean,
) {
    api::set_tone_on(is_tone_on != JNI_FALSE);
}

#[no_mangle]
pub extern "system" fn Java_com_example_playback_PlaybackEngine_setAudioDeviceId(
    _env: JNIEnv,
    _class: JClass,
    device_id: jint,
) {
    api::set_audio_device_id(device_id);
}

#[no_mangle]
pub extern "system" fn Java_com_example_playback_PlaybackEngine_setBufferSizeInBursts(
    _env: JNIEnv,
    _class: JClass,
    buffer_size_in_bursts: jint,
) {
    api::set_buffer_size_in_bursts(buffer_size_in_bursts);
}

#[no_mangle]
pub extern "system" fn Java_com_example_playback_PlaybackEngine_getCurrentOutputLatencyMillis(
    _env: JNIEnv,
    _class: JClass,
) -> jdouble {
    api::get_current_output_latency_millis()
}

fn init_android_context(env: &mut JNIEnv, context: &JObject) -> Result<(), AudioError> {
    let vm = env.get_java_vm().map_err(jni_init_error)?;
    let global = env.new_global_ref(context).map_err(jni_init_error)?;

    if ANDROID_CONTEXT.set(global).is_err() {
        log::debug!("[JNI] Android context already initialized");
        return Ok(());
    }

    let context_ref = ANDROID_CONTEXT.get().ok_or_else(|| AudioError::JniInitFailed {
        reason: "context reference missing after set".to_string(),
    })?;

    // SAFETY: the VM pointer comes from the running JVM and the context is a
    // global reference held in ANDROID_CONTEXT for the life of the process.
    unsafe {
        ndk_context::initialize_android_context(
            vm.get_java_vm_pointer().cast(),
            context_ref.as_obj().as_raw().cast(),
        );
    }

    telemetry::hub().record_lifecycle(LifecyclePhase::ContextInitialized);
    log::info!("[JNI] Android context initialized");
    Ok(())
}

fn jni_init_error(err: jni::errors::Error) -> AudioError {
    AudioError::JniInitFailed {
        reason: err.to_string(),
    }
}
