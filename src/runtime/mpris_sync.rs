use crate::app::App;
use crate::audio::MediaOutput;
use crate::mpris::MprisHandle;

pub fn update_mpris<O: MediaOutput>(mpris: &MprisHandle, app: &App<O>) {
    mpris.set_track_metadata(app.engine.current_index(), app.now_playing());
    mpris.set_playback(app.engine.status());
    mpris.set_position(app.engine.position());
}
