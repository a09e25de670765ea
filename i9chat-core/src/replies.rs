//! Fixed chat replies.

pub const APOLOGY: &str =
    "Desculpe, não consegui processar sua mensagem agora. Tente novamente em instantes.";

pub const DELIVERY_NOT_FOUND: &str = "Nenhuma entrega encontrada com o ID informado.";
pub const DRIVER_NOT_FOUND: &str = "Nenhum entregador encontrado com o ID informado.";

pub const ASK_DESTINATION: &str = "Qual é o endereço de destino? Informe no formato: \
Rua, Número - Bairro, Cidade - UF, CEP";
pub const INVALID_ADDRESS: &str = "Não entendi o endereço. Use o formato: \
Rua, Número - Bairro, Cidade - UF, CEP (ex.: R. Teste, 100 - Centro, Itu - SP, 13300-000)";
pub const ASK_RESPONSIBLE: &str = "Qual é o nome do responsável pela entrega?";
pub const RESPONSIBLE_NOT_FOUND: &str =
    "Responsável não encontrado. Informe o nome completo de um cliente cadastrado.";
pub const ASK_ORIGIN: &str = "Não temos um endereço de coleta cadastrado para esse responsável. \
Qual é o endereço de origem? Use o mesmo formato: Rua, Número - Bairro, Cidade - UF, CEP";

/// Placeholder courier when there is nothing to sample from.
pub const UNASSIGNED_COURIER: &str = "A definir";

pub const BOT_PAUSED_NOTICE: &str = "Um atendente humano assumiu esta conversa.";

pub fn delivery_created(summary: &str) -> String {
    format!("Entrega cadastrada com sucesso!\n{summary}")
}
