//! Tile address conversions: `quadkey` and `address`.

use terrastream::coord::{tile_to_lat_lon, TileAddress};

use crate::error::CliError;

/// Run the quadkey command.
pub fn run_quadkey(x: u32, y: u32, zoom: u8) -> Result<(), CliError> {
    let address = TileAddress::checked(x, y, zoom)?;
    print!("{}", describe(&address));
    Ok(())
}

/// Run the address command.
pub fn run_address(quadkey: &str) -> Result<(), CliError> {
    let address = TileAddress::from_quadkey(quadkey.trim())?;
    print!("{}", describe(&address));
    Ok(())
}

/// Multi-line summary of a tile: address, quadkey and corner coordinates.
fn describe(address: &TileAddress) -> String {
    let (north, west) = tile_to_lat_lon(address);
    let (south, east) = tile_to_lat_lon(&TileAddress::new(
        address.x + 1,
        address.y + 1,
        address.zoom,
    ));
    let quadkey = address.quadkey();

    let mut out = String::new();
    out.push_str(&format!("Tile:    {}\n", address));
    out.push_str(&format!(
        "Quadkey: {}\n",
        if quadkey.is_empty() { "(root)" } else { &quadkey }
    ));
    out.push_str(&format!("North:   {:.6}\n", north));
    out.push_str(&format!("South:   {:.6}\n", south));
    out.push_str(&format!("West:    {:.6}\n", west));
    out.push_str(&format!("East:    {:.6}\n", east));
    if let Some(parent) = address.parent() {
        out.push_str(&format!("Parent:  {}\n", parent));
    }
    out
}
