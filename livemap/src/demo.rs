use std::f64::consts::{PI, TAU};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use anyhow::{Result, anyhow};
use livemap_messages::{Degrees, GeoPoint, Metres, VehicleKind, VehicleSnapshot, VehicleStatus};
use log::{debug, info, warn};
use tungstenite::Message;

use crate::cli::DemoArgs;

/// How often the simulated vehicles move.
const SIMULATION_TICK: Duration = Duration::from_millis(100);

/// Phase advance per vehicle update, in radians.
const PHASE_STEP: f64 = 0.01;

/// Radius of each vehicle's circle, in degrees of latitude/longitude.
const ORBIT_RADIUS: f64 = 0.01;

const FLEET: [(&str, GeoPoint, VehicleStatus, VehicleKind); 3] = [
    ("1", GeoPoint::new(51.52, -0.12), VehicleStatus::Ok, VehicleKind::MultiRotor),
    ("2", GeoPoint::new(51.505, -0.09), VehicleStatus::Warn, VehicleKind::FixedWing),
    ("3", GeoPoint::new(51.505, -0.12), VehicleStatus::Error, VehicleKind::FixedWing),
];

/// Three vehicles flying circles around fixed centres.
pub struct Simulation {
    vehicles: Vec<VehicleSnapshot>,
    centres: Vec<GeoPoint>,
    /// Shared by the whole fleet and advanced once per vehicle moved.
    phase: f64,
}

impl Simulation {
    pub fn new() -> Self {
        let vehicles = FLEET
            .iter()
            .map(|&(id, centre, status, kind)| VehicleSnapshot {
                id: id.to_owned(),
                lat: centre.lat,
                lng: centre.lng,
                alt: Metres(400.0),
                hdg: Degrees(90.0),
                status,
                kind,
            })
            .collect();

        Self {
            vehicles,
            centres: FLEET.iter().map(|&(_, centre, _, _)| centre).collect(),
            phase: 0.0,
        }
    }

    /// Move every vehicle one step along its circle.
    pub fn step(&mut self) {
        for (vehicle, centre) in self.vehicles.iter_mut().zip(&self.centres) {
            vehicle.hdg = Degrees(90.0 + self.phase / PI * 180.0);
            vehicle.lat = centre.lat + ORBIT_RADIUS * self.phase.cos();
            vehicle.lng = centre.lng + ORBIT_RADIUS * self.phase.sin();
            self.phase = (self.phase + PHASE_STEP) % TAU;
        }
    }

    pub fn vehicles(&self) -> &[VehicleSnapshot] {
        &self.vehicles
    }

    /// The current fleet as one feed message.
    pub fn payload(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.vehicles)?)
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new()
    }
}

/// Run the demo feed server until the process is killed.
pub fn run(args: &DemoArgs) -> Result<()> {
    let listener = TcpListener::bind(&args.bind)?;
    info!("Demo feed listening on {}", listener.local_addr()?);
    serve(listener, Duration::from_millis(args.interval_ms))
}

/// Simulate the fleet and stream it to every subscriber that connects.
pub fn serve(listener: TcpListener, interval: Duration) -> Result<()> {
    let simulation = Arc::new(Mutex::new(Simulation::new()));

    let ticker = Arc::clone(&simulation);
    thread::spawn(move || {
        loop {
            match ticker.lock() {
                Ok(mut simulation) => simulation.step(),
                Err(_) => break,
            }
            thread::sleep(SIMULATION_TICK);
        }
    });

    for stream in listener.incoming() {
        let stream = match stream {
            Ok(stream) => stream,
            Err(e) => {
                warn!("Failed to accept subscriber: {}", e);
                continue;
            }
        };

        let simulation = Arc::clone(&simulation);
        thread::spawn(move || {
            let peer = stream.peer_addr().map(|addr| addr.to_string()).unwrap_or_default();
            info!("Got connection from {}", peer);
            if let Err(e) = stream_fleet(stream, &simulation, interval) {
                debug!("Subscriber {} left: {:#}", peer, e);
            }
        });
    }

    Ok(())
}

fn stream_fleet(
    stream: TcpStream,
    simulation: &Mutex<Simulation>,
    interval: Duration,
) -> Result<()> {
    let mut socket = tungstenite::accept(stream)?;
    loop {
        let payload = simulation
            .lock()
            .map_err(|_| anyhow!("Simulation thread panicked"))?
            .payload()?;
        socket.send(Message::text(payload))?;
        thread::sleep(interval);
    }
}
