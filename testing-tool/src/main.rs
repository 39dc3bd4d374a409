use chrono::{Duration, Utc};
use colored::*;
use serde_json::{json, Value};
use std::io::{self, Write};

struct Session {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    println!("{}", "🅿️ Parking Allocator Testing Tool".bright_blue().bold());
    println!("{}", "=====================================".bright_blue());
    println!();

    // Paso 1: Servidor y token
    let session = get_session()?;

    // Paso 2: Comprobar que el servidor responde
    check_health(&session).await?;

    // Paso 3: Menú principal
    loop {
        println!();
        println!("{}", "📋 MENÚ PRINCIPAL".bright_green().bold());
        println!("{}", "==================".bright_green());
        println!("1. 🅿️  Listar plazas");
        println!("2. 🎫 Emitir ticket");
        println!("3. ⏩ Extender ticket");
        println!("4. 🚫 Anular ticket");
        println!("5. 🔓 Liberar plaza");
        println!("6. 📊 Estadísticas");
        println!("7. 🚪 Salir");
        let choice = prompt("Selecciona una opción (1-7): ")?;

        let result = match choice.as_str() {
            "1" => send(&session, reqwest::Method::GET, "/api/parking-spots", None).await,
            "2" => issue_ticket(&session).await,
            "3" => {
                let id = prompt("Ticket ID: ")?;
                let minutes = prompt("Minutos (vacío = por defecto): ")?;
                let body = match minutes.parse::<i64>() {
                    Ok(minutes) => json!({ "action": "extend", "extend_by_minutes": minutes }),
                    Err(_) => json!({ "action": "extend" }),
                };
                send(&session, reqwest::Method::PUT, &format!("/api/tickets/{}", id), Some(body)).await
            }
            "4" => {
                let id = prompt("Ticket ID: ")?;
                let body = json!({ "action": "void" });
                send(&session, reqwest::Method::PUT, &format!("/api/tickets/{}", id), Some(body)).await
            }
            "5" => {
                let id = prompt("Plaza ID: ")?;
                let body = json!({ "status": "Available" });
                send(&session, reqwest::Method::PUT, &format!("/api/parking-spots/{}", id), Some(body)).await
            }
            "6" => {
                send(&session, reqwest::Method::GET, "/api/tickets/stats", None).await?;
                send(&session, reqwest::Method::GET, "/api/parking-spots/summary", None).await
            }
            "7" => {
                println!("{}", "👋 ¡Hasta luego!".bright_green());
                break;
            }
            _ => {
                println!("{}", "❌ Opción inválida. Intenta de nuevo.".bright_red());
                Ok(())
            }
        };

        if let Err(e) = result {
            println!("{} {}", "❌ Error:".bright_red(), e);
        }
    }

    Ok(())
}

fn prompt(label: &str) -> anyhow::Result<String> {
    print!("{}", label.bright_yellow());
    io::stdout().flush()?;
    let mut value = String::new();
    io::stdin().read_line(&mut value)?;
    Ok(value.trim().to_string())
}

fn get_session() -> anyhow::Result<Session> {
    println!("{}", "🔐 CONEXIÓN".bright_cyan().bold());
    println!("{}", "===========".bright_cyan());

    let base_url = match prompt("URL del servidor (vacío = http://localhost:5001): ")? {
        url if url.is_empty() => "http://localhost:5001".to_string(),
        url => url.trim_end_matches('/').to_string(),
    };

    let token = match std::env::var("PARKING_TOKEN") {
        Ok(token) if !token.is_empty() => {
            println!("{}", "🔑 Token tomado de PARKING_TOKEN".bright_blue());
            token
        }
        _ => prompt("Bearer token: ")?,
    };

    Ok(Session {
        client: reqwest::Client::new(),
        base_url,
        token,
    })
}

async fn check_health(session: &Session) -> anyhow::Result<()> {
    let response = session
        .client
        .get(format!("{}/health", session.base_url))
        .send()
        .await?;
    let body: Value = response.json().await?;
    println!("{} {}", "✅ Servidor:".bright_green(), body["status"]);
    Ok(())
}

async fn issue_ticket(session: &Session) -> anyhow::Result<()> {
    let license_plate = prompt("Matrícula: ")?;
    let parking_spot_id: i64 = prompt("Plaza ID: ")?.parse()?;
    let service_id: i64 = prompt("Servicio ID: ")?.parse()?;
    let hours: i64 = prompt("Horas (vacío = 8): ")?.parse().unwrap_or(8);

    let now = Utc::now();
    let body = json!({
        "license_plate": license_plate,
        "issued_time": now.to_rfc3339(),
        "expired_time": (now + Duration::hours(hours)).to_rfc3339(),
        "service_id": service_id,
        "parking_spot_id": parking_spot_id
    });

    send(session, reqwest::Method::POST, "/api/tickets", Some(body)).await
}

async fn send(
    session: &Session,
    method: reqwest::Method,
    path: &str,
    body: Option<Value>,
) -> anyhow::Result<()> {
    let url = format!("{}{}", session.base_url, path);
    println!("{} {} {}", "📤".bright_blue(), method, url);

    let mut request = session.client.request(method, &url).bearer_auth(&session.token);
    if let Some(body) = &body {
        println!("{}", serde_json::to_string_pretty(body)?);
        request = request.json(body);
    }

    let response = request.send().await?;
    let status = response.status();
    let text = response.text().await?;
    let pretty = serde_json::from_str::<Value>(&text)
        .and_then(|v| serde_json::to_string_pretty(&v))
        .unwrap_or(text);

    if status.is_success() {
        println!("{} {}", "📥".bright_green(), status.to_string().bright_green());
    } else {
        println!("{} {}", "📥".bright_red(), status.to_string().bright_red());
    }
    println!("{}", pretty);
    Ok(())
}
