#![no_main]

use libfuzzer_sys::fuzz_target;
use rcon_protocol::protocol::catalog;
use rcon_protocol::protocol::events::ServerEvent;

fuzz_target!(|data: &[u8]| {
    // Arbitrary server words through every response layout and event layout
    let text = String::from_utf8_lossy(data);
    let words: Vec<String> = text.split('\u{0}').map(str::to_string).collect();

    let requests = [
        catalog::version(),
        catalog::server_info(),
        catalog::list_players(catalog::PlayerSubset::All),
        catalog::ban_list_entries(None),
        catalog::map_list_entries(),
        catalog::map_list_indices(),
        catalog::map_list_rounds(),
        catalog::game_admins(),
    ];
    for request in requests {
        if let (_, Some(cast)) = request.into_parts() {
            let _ = cast.apply(&words);
        }
    }

    if let Some((name, rest)) = words.split_first() {
        let _ = ServerEvent::new(name.clone(), rest.to_vec());
    }
});
