//! Built-in dialogue

use super::graph::{ActionTag, Choice, DialogueNode, NodeId};

/// Presentation tag of the final choice
pub const DESTROY_STYLE: &str = "destroy";

/// The eight nodes of the built-in walk
#[must_use]
pub fn builtin_nodes() -> Vec<DialogueNode> {
    use NodeId::{Entry, Index};

    vec![
        DialogueNode::new(
            Entry,
            "Oichi... A desilusão da família Mori.",
            vec![
                Choice::next("Onde eu estou?", Index(0)),
                Choice::next("Que lugar é este?", Index(0)),
            ],
        ),
        DialogueNode::new(
            Index(0),
            "Você está no Santuário dos Mortos.",
            vec![
                Choice::next("Isso é a Mikoshi?", Index(1)),
                Choice::next("Existem respostas aqui?", Index(1)),
            ],
        ),
        DialogueNode::new(
            Index(1),
            "Você busca respostas simples quando elas não existem. \
             Esta é a grande ilusão na qual o seu mundo se baseia.",
            vec![
                Choice::next("Eu vim resgatar meu irmão.", Index(2)),
                Choice::next("Eu não ligo. Onde está meu irmão?.", Index(2)),
            ],
        ),
        DialogueNode::new(
            Index(2),
            "Seu irmão? O código dele foi desconstruído. Ele não sente dor, nem saudade. \
             Se você o acordar, ele pode não ser quem você lembra.",
            vec![
                Choice::next("Eu não me importo. Ele é meu sangue.", Index(3)),
                Choice::next("Mesmo que seja apenas um eco, eu preciso tentar.", Index(3)),
            ],
        ),
        DialogueNode::new(
            Index(3),
            "E há outros ecos presos a você. Artemis... Ela canta para a Lua, \
             esperando que você volte. Se você falhar aqui, a música dela se tornará \
             um réquiem. Você aceita destruir o mundo dela?",
            vec![
                Choice::next("Ela é minha força, não minha fraqueza.", Index(4)),
                Choice::next("Eu fiz uma promessa. Eu vou voltar.", Index(4)),
            ],
        ),
        DialogueNode::new(
            Index(4),
            "Sua vontade é fascinante. Se você busca a verdade sobre meu mestre, \
             saiba que eu sempre fui o Vazio que te guiou até aqui.",
            vec![
                Choice::next("Quem é seu mestre?", Index(5)),
                Choice::next("O que é você?", Index(5)),
            ],
        ),
        DialogueNode::new(
            Index(5),
            "Fui criado para proteger meus mestres. Itsuki Mori e ",
            vec![
                Choice::next("Nulo... É você?", Index(6)),
                Choice::next("Você é o...?", Index(6)),
            ],
        )
        .decorated(),
        DialogueNode::new(
            Index(6),
            "Eu sou Nulo, e irei te ajudar, sendo o Vazio que percorre por tudo. \
             Se é da tua vontade, iremos destruir a Mikoshi juntos.",
            vec![Choice::terminal("[CONEXÃO FORÇADA] DESTRUIR A MIKOSHI", ActionTag::Destroy)
                .styled(DESTROY_STYLE)],
        )
        .critical(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialogue::{ChoiceTarget, DialogueGraph};

    #[test]
    fn test_builtin_graph_is_valid() {
        let graph = DialogueGraph::builtin().unwrap();
        assert_eq!(graph.len(), 8);
    }

    #[test]
    fn test_builtin_walk_reaches_destroy() {
        let graph = DialogueGraph::builtin().unwrap();
        let mut id = NodeId::Entry;
        let mut steps = 0;
        loop {
            let node = graph.lookup(id).unwrap();
            match node.choices[0].target {
                ChoiceTarget::Next(next) => id = next,
                ChoiceTarget::Terminal(action) => {
                    assert_eq!(action, ActionTag::Destroy);
                    assert!(node.critical);
                    break;
                }
            }
            steps += 1;
        }
        assert_eq!(steps, 7);
    }

    #[test]
    fn test_only_node_five_is_decorated() {
        let decorated: Vec<NodeId> = builtin_nodes()
            .into_iter()
            .filter(|n| n.decorated)
            .map(|n| n.id)
            .collect();
        assert_eq!(decorated, vec![NodeId::Index(5)]);
    }
}
